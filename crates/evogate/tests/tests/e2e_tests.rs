#[path = "e2e/rollback_restores_baseline.rs"]
mod rollback_restores_baseline;

#[path = "e2e/concurrent_bundles.rs"]
mod concurrent_bundles;

#[path = "e2e/statistical_pipeline.rs"]
mod statistical_pipeline;

#[path = "e2e/async_evaluation.rs"]
mod async_evaluation;
