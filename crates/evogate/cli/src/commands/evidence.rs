//! Evidence bundle commands

use crate::commands::{open_store, read_json};
use crate::config::EvogateConfig;
use crate::error::{CliError, CliResult};
use crate::output::print_json;
use clap::Subcommand;
use evogate_evaluator::StatisticalEvaluator;
use evogate_evidence::{Backoff, StoreError, METRICS_FILE};
use evogate_scorer::PromotionScorer;
use evogate_types::{BundleId, Digest, EvaluationStatus, MetricsVector};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Subcommand)]
pub enum EvidenceCommands {
    /// Collect, evaluate and seal a new bundle
    Create {
        /// Bound evaluation by the adaptive timeout instead of blocking on it
        #[arg(long = "async")]
        run_async: bool,
    },

    /// Score a bundle's metrics against the configured thresholds
    ///
    /// Exits 0 whatever the verdict. A bundle with no metrics vector and no
    /// --metrics is a read failure and exits 1.
    Score {
        /// Bundle ID or `latest`
        bundle: String,

        /// Metrics vector to score instead of the bundle's own copy
        #[arg(long)]
        metrics: Option<PathBuf>,
    },

    /// Re-hash a sealed bundle against its self-manifest
    Verify {
        /// Bundle ID or `latest`
        bundle: String,
    },

    /// List sealed bundles, newest last
    List,
}

#[derive(Serialize)]
struct ScoreOutput {
    bundle_id: BundleId,
    score: f64,
    passed: bool,
    reasons: Vec<String>,
    threshold: f64,
    status: EvaluationStatus,
    sample_count: u64,
    p_value: Option<f64>,
}

#[derive(Serialize)]
struct VerifyOutput {
    bundle_id: BundleId,
    intact: bool,
    manifest_digest: Digest,
}

pub async fn execute(command: EvidenceCommands, config: &EvogateConfig) -> CliResult<()> {
    let store = open_store(&config.store)?;
    match command {
        EvidenceCommands::Create { run_async } => {
            config.evaluation.validate()?;
            let evaluator = StatisticalEvaluator::new(config.evaluation.clone());
            let id = if run_async {
                store.create_bundle_async(Arc::new(evaluator)).await?
            } else {
                store.create_bundle(&evaluator)?
            };
            info!(bundle = %id, "bundle sealed");
            println!("{}", id);
            Ok(())
        }

        EvidenceCommands::Score { bundle, metrics } => {
            let id = store.resolve(&bundle)?;
            if !store.bundle_dir(&id).is_dir() {
                return Err(StoreError::BundleNotFound(id).into());
            }
            // The artifact can trail bundle creation by a moment.
            let artifact = store.wait_for_artifact(&id, &Backoff::polling())?;
            let vector: MetricsVector = match metrics {
                Some(path) => read_json(&path)?,
                None => match store.read_metrics(&id)? {
                    Some(vector) => vector,
                    None => {
                        return Err(CliError::Read {
                            path: store.bundle_dir(&id).join(METRICS_FILE),
                            source: io::Error::new(
                                io::ErrorKind::NotFound,
                                "bundle carries no metrics vector; pass --metrics",
                            ),
                        })
                    }
                },
            };
            let vector = if vector.canary_ks.is_none() {
                vector.with_canary_ks(artifact.uniformity.ks_statistic)
            } else {
                vector
            };
            let card = PromotionScorer::new(config.scorer.clone())?.score(&vector);
            print_json(&ScoreOutput {
                bundle_id: id,
                score: card.score,
                passed: card.passed,
                reasons: card.reasons,
                threshold: card.threshold,
                status: artifact.status,
                sample_count: artifact.sample_count,
                p_value: artifact.p_value,
            })
        }

        EvidenceCommands::Verify { bundle } => {
            let id = store.resolve(&bundle)?;
            match store.verify(&id) {
                Ok(digest) => print_json(&VerifyOutput {
                    bundle_id: id,
                    intact: true,
                    manifest_digest: digest,
                }),
                Err(StoreError::Tampered { id, drift }) => {
                    for d in &drift {
                        error!(bundle = %id, path = d.path(), drift = ?d, "bundle drift");
                    }
                    Err(StoreError::Tampered { id, drift }.into())
                }
                Err(e) => Err(e.into()),
            }
        }

        EvidenceCommands::List => {
            for id in store.list()? {
                println!("{}", id);
            }
            Ok(())
        }
    }
}
