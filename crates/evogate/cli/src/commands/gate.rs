//! Gate commands

use crate::commands::{open_store, read_json};
use crate::config::EvogateConfig;
use crate::error::{CliError, CliResult};
use crate::output::print_json;
use clap::Subcommand;
use evogate_executor::{
    GateError, GateExecutor, GateInput, GateOutcome, GitVcs, ScriptHook,
};
use evogate_scorer::PromotionScorer;
use evogate_stability::OperationalSample;
use evogate_types::{DecisionKind, MetricsVector};
use serde_json::json;
use std::path::PathBuf;
use tracing::error;

/// Exit code for PROMOTE.
pub const EXIT_PROMOTE: u8 = 0;
/// Exit code for RETRY, and for a cycle skipped because the gate was busy.
pub const EXIT_RETRY: u8 = 3;
/// Exit code for ROLLBACK.
pub const EXIT_ROLLBACK: u8 = 4;

#[derive(Subcommand)]
pub enum GateCommands {
    /// Decide PROMOTE / ROLLBACK / RETRY for one cycle and act on it
    Run {
        /// Metrics vector (JSON)
        #[arg(long)]
        metrics: PathBuf,

        /// Bundle whose evaluation feeds the decision (ID or `latest`)
        #[arg(long)]
        bundle: Option<String>,

        /// Operational sample for the stability monitor (JSON)
        #[arg(long)]
        ops: Option<PathBuf>,

        /// Print the decision without acting or recording it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recent decisions
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

pub fn exit_code(kind: DecisionKind) -> u8 {
    match kind {
        DecisionKind::Promote => EXIT_PROMOTE,
        DecisionKind::Retry => EXIT_RETRY,
        DecisionKind::Rollback => EXIT_ROLLBACK,
    }
}

fn executor(config: &EvogateConfig) -> CliResult<GateExecutor> {
    let store = open_store(&config.store)?;
    let scorer = PromotionScorer::new(config.scorer.clone())?;
    let vcs = Box::new(GitVcs::new(config.gate.repo.clone()));
    let mut gate = GateExecutor::new(config.gate.clone(), store, scorer, vcs)?
        .with_stability(config.stability.clone());
    if let Some(path) = &config.gate.recovery_hook {
        gate = gate.with_recovery_hook(Box::new(ScriptHook::new(
            path.clone(),
            config.gate.hook_timeout(),
        )));
    }
    Ok(gate)
}

/// Returns the process exit code.
pub fn execute(command: GateCommands, config: &EvogateConfig) -> CliResult<u8> {
    match command {
        GateCommands::Run {
            metrics,
            bundle,
            ops,
            dry_run,
        } => {
            let metrics: MetricsVector = read_json(&metrics)?;
            let mut input = GateInput::new(metrics);
            if let Some(reference) = bundle {
                let store = open_store(&config.store)?;
                input = input.with_bundle(store.resolve(&reference)?);
            }
            if let Some(path) = ops {
                let sample: OperationalSample = read_json(&path)?;
                input = input.with_operational(sample);
            }

            let gate = executor(config)?;
            if dry_run {
                let decision = gate.dry_run(&input)?;
                print_json(&decision)?;
                return Ok(exit_code(decision.kind));
            }
            match gate.run(&input) {
                Ok(GateOutcome::Decided(decision)) => {
                    print_json(&decision)?;
                    Ok(exit_code(decision.kind))
                }
                Ok(GateOutcome::Skipped { holder }) => {
                    print_json(&json!({ "skipped": true, "holder": holder }))?;
                    Ok(EXIT_RETRY)
                }
                Err(GateError::ActionFailed { decision, reason }) => {
                    print_json(&decision)?;
                    error!(%reason, "version-control action failed; the decision was recorded but not carried out");
                    Err(CliError::Gate(GateError::ActionFailed { decision, reason }))
                }
                Err(e) => Err(e.into()),
            }
        }

        GateCommands::History { limit } => {
            let gate = executor(config)?;
            print_json(&gate.history(limit)?)?;
            Ok(EXIT_PROMOTE)
        }
    }
}
