//! Property: the decision table's safety rules hold for arbitrary inputs.

use chrono::{Duration, Utc};
use evogate_executor::{DecisionLedger, GateConfig, GateInput};
use evogate_tests::{healthy_metrics, Fixture};
use evogate_types::{DecisionKind, GateDecision, MetricsVector, RetryCause};
use proptest::prelude::*;

fn arb_metrics() -> impl Strategy<Value = MetricsVector> {
    (
        0.0f64..1.0,
        0.0f64..0.2,
        0.0f64..0.1,
        -2.0f64..5.0,
        0.0f64..1.0,
        0.0f64..1.0,
    )
        .prop_map(|(accuracy, hallucination_rate, regression_rate, latency_z, cost_efficiency, recall)| {
            MetricsVector {
                accuracy,
                hallucination_rate,
                regression_rate,
                latency_z,
                cost_efficiency,
                recall,
                ..Default::default()
            }
        })
}

fn arb_record() -> impl Strategy<Value = (DecisionKind, bool, RetryCause)> {
    (
        prop_oneof![
            Just(DecisionKind::Promote),
            Just(DecisionKind::Rollback),
            Just(DecisionKind::Retry),
        ],
        any::<bool>(),
        prop_oneof![
            Just(RetryCause::Shortfall),
            Just(RetryCause::Instability),
            Just(RetryCause::PassRate),
        ],
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn violated_limit_never_promotes(metrics in arb_metrics()) {
        let fx = Fixture::new();
        let gate = fx.gate(fx.store(), GateConfig::default());
        let d = gate.dry_run(&GateInput::new(metrics.clone())).unwrap();
        let violated = metrics.hallucination_rate > 0.08
            || metrics.regression_rate > 0.05
            || metrics.latency_z > 3.0;
        if violated {
            prop_assert_eq!(d.kind, DecisionKind::Rollback);
            prop_assert!(!d.passed);
        }
        prop_assert_eq!(d.kind == DecisionKind::Promote, d.passed);
    }

    #[test]
    fn low_pass_rate_never_promotes(
        history in prop::collection::vec(arb_record(), 10),
    ) {
        let passed = history.iter().filter(|(_, p, _)| *p).count();
        prop_assume!(passed < 10);

        let fx = Fixture::new();
        let store = fx.store();
        let ledger = DecisionLedger::new(store.root());
        for (i, (kind, passed, cause)) in history.iter().enumerate() {
            let mut d = GateDecision::new(*kind, 0.8, *passed, healthy_metrics());
            if *kind == DecisionKind::Retry {
                d.retry_cause = Some(*cause);
            }
            d.decided_at = Utc::now() - Duration::seconds(100 - i as i64);
            ledger.append(&d).unwrap();
        }
        let gate = fx.gate(store, GateConfig::default());
        let d = gate.dry_run(&GateInput::new(healthy_metrics())).unwrap();
        prop_assert_eq!(d.kind, DecisionKind::Retry);
        prop_assert!(d.passed);
        prop_assert_eq!(d.retry_cause, Some(RetryCause::PassRate));
        prop_assert!(d.reasons.iter().any(|r| r.contains("pass rate")));
        prop_assert!(!d.reasons.iter().any(|r| r.starts_with("retry limit")));
    }
}
