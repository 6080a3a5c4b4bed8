//! Command implementations for the jpd-sync CLI

mod inspect;
mod plan;
mod render;

pub use inspect::run_inspect;
pub use plan::run_plan;
pub use render::run_render;

use jpd_core::SyncConfig;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::{CliError, Result};

/// Read a JSON snapshot file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::Snapshot {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| CliError::Snapshot {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Fail fast on `function:` mappings.
///
/// Functions are registered in code through `Transformer::with_loader` and
/// the command line has no loader.
pub(crate) fn reject_function_mappings(config: &SyncConfig) -> Result<()> {
    let found = config.mapping.function_mappings();
    if found.is_empty() {
        return Ok(());
    }
    let listed: Vec<String> = found
        .iter()
        .map(|(target, path)| format!("{target} -> {path}"))
        .collect();
    Err(CliError::user(format!(
        "function mappings are not available from the command line ({}); register them with Transformer::with_loader",
        listed.join(", ")
    )))
}
