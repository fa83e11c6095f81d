//! Property: every artifact line carries its full label set, for any
//! number of samples and any evaluator outcome.

use evogate_evaluator::StatisticalEvaluator;
use evogate_evidence::{BundleEvaluator, SimulatedEvaluator};
use evogate_tests::{ab_events, Fixture};
use evogate_types::exposition;
use evogate_types::artifact::TEST_NAME;
use evogate_types::EvaluationArtifact;
use proptest::prelude::*;

fn assert_labelled(text: &str) -> Result<(), TestCaseError> {
    let samples = exposition::parse(text).map_err(|e| TestCaseError::fail(e.to_string()))?;
    prop_assert!(!samples.is_empty());
    for s in &samples {
        prop_assert!(s.label("bundle").is_some(), "{} lacks bundle label", s.name);
        prop_assert!(s.label("status").is_some(), "{} lacks status label", s.name);
        match s.name.as_str() {
            "evogate_eval_p_value" => prop_assert_eq!(s.label("test"), Some(TEST_NAME)),
            "evogate_eval_events" => prop_assert!(s.label("class").is_some()),
            "evogate_eval_pvalue_uniformity_ks" | "evogate_eval_pvalue_variance" => {
                prop_assert!(s.label("window").is_some())
            }
            "evogate_eval_info" => prop_assert!(s.label("error").is_some()),
            _ => {}
        }
    }
    for line in text.lines().filter(|l| !l.starts_with('#')) {
        prop_assert!(line.contains('{'), "unlabelled line: {}", line);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn statistical_artifact_is_fully_labelled(pairs in 0usize..40, shift in -1.0f64..1.0) {
        let fx = Fixture::new();
        fx.write_events(&ab_events(pairs, shift));
        let store = fx.store();
        let id = store.create_bundle(&StatisticalEvaluator::default()).unwrap();
        let text = std::fs::read_to_string(store.bundle_dir(&id).join("evaluation.prom")).unwrap();
        assert_labelled(&text)?;

        let artifact = EvaluationArtifact::parse(&text).unwrap();
        prop_assert_eq!(artifact.sample_count == 0, artifact.p_value.is_none());
    }

    #[test]
    fn failure_artifacts_are_fully_labelled(which in 0u8..3) {
        let evaluator: Box<dyn BundleEvaluator> = match which {
            0 => Box::new(SimulatedEvaluator::insufficient()),
            1 => Box::new(SimulatedEvaluator::failing("backend unavailable")),
            _ => Box::new(SimulatedEvaluator::panicking()),
        };
        let fx = Fixture::new();
        let store = fx.store();
        let id = store.create_bundle(evaluator.as_ref()).unwrap();
        let artifact = store.read_artifact(&id).unwrap();
        prop_assert_eq!(artifact.sample_count, 0);
        assert_labelled(&artifact.to_exposition())?;
    }
}
