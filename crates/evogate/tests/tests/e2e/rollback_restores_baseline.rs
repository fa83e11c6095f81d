//! End-to-end: PROMOTE, RETRY, RETRY, ROLLBACK restores the promoted tree
//! hash-for-hash.

use evogate_evidence::{SimulatedEvaluator, StoreConfig};
use evogate_executor::{GateConfig, GateInput, GateOutcome};
use evogate_tests::{hallucinating_metrics, healthy_metrics, Fixture};
use evogate_types::{DecisionKind, GateDecision, Manifest};
use std::fs;

fn decided(outcome: GateOutcome) -> GateDecision {
    match outcome {
        GateOutcome::Decided(d) => d,
        GateOutcome::Skipped { .. } => panic!("gate unexpectedly busy"),
    }
}

#[test]
fn rollback_matches_promoted_anchor_manifest() {
    let fx = Fixture::new();
    fx.write_work_file("model/weights.bin", "w-1");
    fx.write_work_file("prompts/system.txt", "be careful");
    fx.write_work_file("config.toml", "temperature = 0.2");

    // Anchor manifest of the tree being promoted, copied into the bundle.
    let anchor_path = fx.inputs_dir.path().join("anchor.sha256");
    let anchor = Manifest::from_dir(fx.work(), &[]).unwrap();
    fs::write(&anchor_path, anchor.render()).unwrap();
    let store = evogate_evidence::EvidenceStore::open(
        StoreConfig::new(fx.store_dir.path()).with_anchor_manifest(&anchor_path),
    )
    .unwrap();
    let gate = fx.gate(store.clone(), GateConfig::default());

    let promoted_bundle = store.create_bundle(&SimulatedEvaluator::passing(32, 0.02)).unwrap();
    let promote = decided(
        gate.run(&GateInput::new(healthy_metrics()).with_bundle(promoted_bundle.clone()))
            .unwrap(),
    );
    assert_eq!(promote.kind, DecisionKind::Promote);
    let tag_a = promote.tag.clone().unwrap();

    // The candidate drifts: edits, an addition, a deletion.
    fx.write_work_file("model/weights.bin", "w-2");
    fx.write_work_file("model/adapter.bin", "extra");
    fs::remove_file(fx.work().join("prompts/system.txt")).unwrap();

    for n in 1..=2 {
        let thin = store.create_bundle(&SimulatedEvaluator::insufficient()).unwrap();
        let retry = decided(gate.run(&GateInput::new(healthy_metrics()).with_bundle(thin)).unwrap());
        assert_eq!(retry.kind, DecisionKind::Retry);
        assert_eq!(retry.retry_count, Some(n));
        assert_eq!(fx.vcs.tag_names(), vec![tag_a.clone()]);
    }

    let failing = store.create_bundle(&SimulatedEvaluator::passing(32, 0.5)).unwrap();
    let rollback = decided(
        gate.run(&GateInput::new(hallucinating_metrics()).with_bundle(failing.clone()))
            .unwrap(),
    );
    assert_eq!(rollback.kind, DecisionKind::Rollback);
    assert_eq!(rollback.tag.as_deref(), Some(tag_a.as_str()));

    let recorded_anchor = Manifest::parse(
        &fs::read_to_string(store.bundle_dir(&promoted_bundle).join("anchor.sha256")).unwrap(),
    )
    .unwrap();
    assert_eq!(recorded_anchor, anchor);
    assert!(recorded_anchor.verify_dir(fx.work(), &[]).unwrap().is_empty());

    assert!(store.bundle_dir(&failing).join("failure_report.json").is_file());
    let kinds: Vec<DecisionKind> = gate.history(10).unwrap().iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DecisionKind::Promote,
            DecisionKind::Retry,
            DecisionKind::Retry,
            DecisionKind::Rollback
        ]
    );
}

#[test]
fn second_promote_becomes_the_rollback_target() {
    let fx = Fixture::new();
    let store = fx.store();
    let gate = fx.gate(store, GateConfig::default());

    fx.write_work_file("app", "v1");
    decided(gate.run(&GateInput::new(healthy_metrics())).unwrap());
    std::thread::sleep(std::time::Duration::from_millis(5));
    fx.write_work_file("app", "v2");
    let second = decided(gate.run(&GateInput::new(healthy_metrics())).unwrap());
    assert_eq!(
        second.audit.as_ref().unwrap().previous_tag.as_deref(),
        fx.vcs.tag_names().first().map(String::as_str)
    );

    fx.write_work_file("app", "v3-bad");
    let rollback = decided(gate.run(&GateInput::new(hallucinating_metrics())).unwrap());
    assert_eq!(rollback.tag, second.tag);
    assert_eq!(fs::read_to_string(fx.work().join("app")).unwrap(), "v2");
}
