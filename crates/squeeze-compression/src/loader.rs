//! Loading compression configuration from files

use crate::config::CompressionConfig;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use squeeze_core::{Error, Result};
use std::env;
use std::fs;
use std::path::Path;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Config("Unable to detect config format".to_string()))?;

        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(Error::Config(format!("Unsupported config format: {ext}"))),
        }
    }
}

// ${VAR} or ${VAR:-default}
static ENV_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid env var pattern")
});

/// Load and validate a configuration file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<CompressionConfig> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {e}", path.display())))?;

    let format = ConfigFormat::from_path(path)?;

    load_from_str(&content, format)
}

/// Parse and validate a configuration string
///
/// `${VAR}` and `${VAR:-default}` references are expanded from the process
/// environment before parsing.
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<CompressionConfig> {
    let expanded = expand_env_vars(content)?;

    let config: CompressionConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse JSON: {e}")))?,
    };

    config.validate()?;
    Ok(config)
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut missing = None;

    let expanded = ENV_VAR.replace_all(content, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (env::var(name), caps.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(Error::Config(format!(
            "Environment variable '{name}' not set and no default provided"
        ))),
        None => Ok(expanded.into_owned()),
    }
}
