//! End-to-end: the asynchronous path seals on time even when evaluation
//! does not finish.

use evogate_evidence::{AdaptiveTimeoutConfig, EvidenceStore, SimulatedEvaluator};
use evogate_executor::{GateConfig, GateInput, GateOutcome};
use evogate_tests::{healthy_metrics, Fixture};
use evogate_types::{DecisionKind, EvaluationStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_evaluation_seals_timeout_artifact_and_gate_retries() {
    let fx = Fixture::new();
    let store = EvidenceStore::open(fx.store_config().with_adaptive_timeout(AdaptiveTimeoutConfig {
        factor: 2.0,
        min_ms: 50,
        max_ms: 100,
        history: 10,
    }))
    .unwrap();

    let started = Instant::now();
    let id = store
        .create_bundle_async(Arc::new(
            SimulatedEvaluator::passing(20, 0.01).with_delay(Duration::from_secs(3)),
        ))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    store.verify(&id).unwrap();
    let artifact = store.read_artifact(&id).unwrap();
    assert_eq!(artifact.status, EvaluationStatus::Timeout);
    assert_eq!(artifact.sample_count, 0);
    assert!(artifact.to_exposition().contains("status=\"timeout\""));

    let gate = fx.gate(store, GateConfig::default());
    let outcome = tokio::task::spawn_blocking(move || {
        gate.run(&GateInput::new(healthy_metrics()).with_bundle(id))
    })
    .await
    .unwrap()
    .unwrap();
    match outcome {
        GateOutcome::Decided(d) => {
            assert_eq!(d.kind, DecisionKind::Retry);
            assert!(d.reasons.iter().any(|r| r == "evaluation shortfall: timeout"));
        }
        other => panic!("unexpected {:?}", other),
    }
}
