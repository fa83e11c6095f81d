//! Adversarial: overlapping gate runs never both act.

use evogate_executor::{GateConfig, GateInput, GateOutcome, DECISIONS_DIR, GATE_LOCK};
use evogate_tests::{healthy_metrics, Fixture};
use std::fs;

#[test]
fn parallel_runs_serialize_or_skip() {
    let fx = Fixture::new();
    fx.write_work_file("app", "v1");
    let store = fx.store();
    let gate = fx.gate(store.clone(), GateConfig::default());

    let outcomes: Vec<GateOutcome> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..6)
            .map(|_| s.spawn(|| gate.run(&GateInput::new(healthy_metrics()))))
            .collect();
        handles
            .into_iter()
            .filter_map(|h| h.join().unwrap().ok())
            .collect()
    });

    let decided = outcomes
        .iter()
        .filter(|o| matches!(o, GateOutcome::Decided(_)))
        .count();
    let recorded = fs::read_dir(store.root().join(DECISIONS_DIR))
        .map(|d| d.count())
        .unwrap_or(0);
    assert!(decided >= 1);
    assert_eq!(recorded, gate.history(100).unwrap().len());
    assert!(!store.root().join(GATE_LOCK).exists());
}

#[test]
fn stale_lock_is_reclaimed() {
    let fx = Fixture::new();
    fx.write_work_file("app", "v1");
    let store = fx.store();
    // Abandoned lock from a crashed run, older than the stale limit.
    fs::write(
        store.root().join(GATE_LOCK),
        r#"{"pid":999999,"purpose":"gate","acquired_at":"2020-01-01T00:00:00Z"}"#,
    )
    .unwrap();
    let gate = fx.gate(store, GateConfig::default());
    assert!(matches!(
        gate.run(&GateInput::new(healthy_metrics())).unwrap(),
        GateOutcome::Decided(_)
    ));
}
