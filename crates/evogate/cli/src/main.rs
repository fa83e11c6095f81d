//! Evogate CLI - evidence bundles and promotion gating
//!
//! - `evidence create|score|verify|list` manage sealed evidence bundles
//! - `gate run` decides PROMOTE / ROLLBACK / RETRY and acts on it
//! - `gate history` shows recorded decisions
//! - `config` prints the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod commands;
mod config;
mod error;
mod output;

use commands::{evidence, gate};
use config::{EvogateConfig, LoggingConfig};
use error::CliResult;

#[derive(Parser)]
#[command(name = "evogate")]
#[command(about = "Evolution gate - evidence-driven promote / rollback / retry", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "EVOGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage evidence bundles
    Evidence {
        #[command(subcommand)]
        command: evidence::EvidenceCommands,
    },

    /// Run the promotion gate
    Gate {
        #[command(subcommand)]
        command: gate::GateCommands,
    },

    /// Show the effective configuration
    Config,
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time();
    let fmt = if logging.json {
        fmt.json().boxed()
    } else {
        fmt.boxed()
    };
    tracing_subscriber::registry().with(filter).with(fmt).init();
}

async fn run(cli: Cli) -> CliResult<u8> {
    let loaded = EvogateConfig::load(cli.config.as_deref())?;
    init_tracing(&loaded.config.logging, cli.verbose);
    let config = loaded.config;

    match cli.command {
        Commands::Evidence { command } => {
            evidence::execute(command, &config).await?;
            Ok(0)
        }
        Commands::Gate { command } => gate::execute(command, &config),
        Commands::Config => {
            match &loaded.source {
                Some(path) => println!("# source: {}", path.display()),
                None => println!("# source: built-in defaults"),
            }
            print!("{}", config.to_toml()?);
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
