//! Format-agnostic configuration loading

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::{Error, Result};

use super::SyncConfig;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension:
    /// - `.yaml`, `.yml` -> YAML
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        match extension.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Parse `content` as `format`. `path` is only used for error messages.
pub fn parse_as<T: DeserializeOwned>(content: &str, format: ConfigFormat, path: &Path) -> Result<T> {
    let parsed = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| Error::ConfigParse {
        path: path.to_path_buf(),
        format: format.name().into(),
        message,
    })
}

impl SyncConfig {
    /// Load a configuration file, detecting the format from its extension.
    ///
    /// # Errors
    ///
    /// All failures are fatal: missing file, unknown extension, or a document
    /// that does not deserialize into [`SyncConfig`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let config: SyncConfig = parse_as(&content, format, path)?;
        tracing::debug!(path = %path.display(), format = format.name(), "Loaded configuration");
        Ok(config)
    }

    /// Parse a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        parse_as(content, ConfigFormat::Yaml, Path::new("<inline>"))
    }
}
