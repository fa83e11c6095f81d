//! `evogate.toml`

use crate::error::{CliError, CliResult};
use evogate_evaluator::EvaluatorConfig;
use evogate_evidence::StoreConfig;
use evogate_executor::GateConfig;
use evogate_scorer::ScorerConfig;
use evogate_stability::StabilityConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG: &str = "evogate.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvogateConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub evaluation: EvaluatorConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Effective configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: EvogateConfig,
    pub source: Option<PathBuf>,
}

impl EvogateConfig {
    /// Explicit path, else `./evogate.toml`, else the user config
    /// directory, else defaults. An explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> CliResult<LoadedConfig> {
        if let Some(path) = explicit {
            return Self::from_file(path).map(|config| LoadedConfig {
                config,
                source: Some(path.to_path_buf()),
            });
        }
        let candidates = [
            Some(PathBuf::from(LOCAL_CONFIG)),
            dirs::config_dir().map(|d| d.join("evogate").join("config.toml")),
        ];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                return Self::from_file(&path).map(|config| LoadedConfig {
                    config,
                    source: Some(path),
                });
            }
        }
        Ok(LoadedConfig {
            config: Self::default(),
            source: None,
        })
    }

    pub fn from_file(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> CliResult<Self> {
        let config: Self = toml::from_str(text).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        self.evaluation.validate()?;
        self.scorer.validate()?;
        self.gate.validate()?;
        Ok(())
    }

    pub fn to_toml(&self) -> CliResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
