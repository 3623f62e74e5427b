//! Config file encodings: JSON, YAML and TOML.

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{PipelineError, Result};

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    Json,
    #[default]
    Yaml,
    Toml,
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Toml => write!(f, "toml"),
        }
    }
}

impl std::str::FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            other => Err(format!(
                "unknown config format: '{other}' (supported: json, yaml, toml)"
            )),
        }
    }
}

impl ConfigFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "cannot infer config format of '{}': no file extension",
                    path.display()
                ))
            })?;
        ext.parse().map_err(PipelineError::Configuration)
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            Self::Json => {
                let mut s = serde_json::to_string_pretty(value)?;
                s.push('\n');
                Ok(s)
            }
            Self::Yaml => Ok(serde_yaml::to_string(value)?),
            Self::Toml => Ok(toml::to_string_pretty(value)?),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, content: &str) -> Result<T> {
        match self {
            Self::Json => Ok(serde_json::from_str(content)?),
            Self::Yaml => Ok(serde_yaml::from_str(content)?),
            Self::Toml => Ok(toml::from_str(content)?),
        }
    }
}

/// Read and decode a config file, inferring the format from its extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)?;
    format.decode(&content)
}
