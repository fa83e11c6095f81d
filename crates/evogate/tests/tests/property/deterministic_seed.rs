//! Property: randomized steps are reproducible from the bundle identity.

use chrono::{TimeZone, Utc};
use evogate_evaluator::{SignFlipTest, StatisticalEvaluator};
use evogate_evidence::EvaluationInput;
use evogate_tests::ab_events;
use evogate_types::BundleId;
use proptest::prelude::*;

proptest! {
    #[test]
    fn sign_flip_is_reproducible(
        diffs in prop::collection::vec(-5.0f64..5.0, 1..60),
        seed in any::<u64>(),
    ) {
        let test = SignFlipTest::new(500);
        let a = test.run(&diffs, seed);
        let b = test.run(&diffs, seed);
        prop_assert_eq!(a, b);
        if let Some(outcome) = a {
            prop_assert!(outcome.p_value > 0.0 && outcome.p_value <= 1.0);
        }
    }

    #[test]
    fn evaluator_is_reproducible_per_bundle(
        pairs in 8usize..30,
        shift in -0.2f64..0.2,
        secs in 1_700_000_000i64..1_800_000_000,
        suffix in any::<u16>(),
    ) {
        let bundle_id = BundleId::from_parts(Utc.timestamp_opt(secs, 0).unwrap(), suffix);
        let input = EvaluationInput {
            bundle_id,
            events: ab_events(pairs, shift),
            prior_p_values: vec![0.2, 0.5, 0.9],
        };
        let evaluator = StatisticalEvaluator::default();
        let first = evaluator.run(&input).unwrap();
        let second = evaluator.run(&input).unwrap();
        prop_assert_eq!(first, second);
    }
}
