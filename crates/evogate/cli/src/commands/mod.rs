//! CLI command implementations

pub mod evidence;
pub mod gate;

use crate::error::{CliError, CliResult};
use evogate_evidence::{EvidenceStore, StoreConfig};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub fn open_store(config: &StoreConfig) -> CliResult<EvidenceStore> {
    Ok(EvidenceStore::open(config.clone())?)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let bytes = fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}
