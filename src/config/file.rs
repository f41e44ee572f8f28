//! TOML configuration file loading
//!
//! Supports `~/.config/line-relay/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct RelayConfigFile {
    /// LINE channel credentials
    #[serde(default)]
    pub line: LineFileConfig,

    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// LINE channel configuration
#[derive(Debug, Default, Deserialize)]
pub struct LineFileConfig {
    pub channel_token: Option<String>,
    pub channel_secret: Option<String>,
}

/// Gemini configuration
#[derive(Debug, Default, Deserialize)]
pub struct GeminiFileConfig {
    pub api_key: Option<String>,

    /// Model identifier (e.g. "gemini-1.5-flash")
    pub model: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Webhook server port
    pub port: Option<u16>,

    /// `SQLite` history database; omit for the stateless relay
    pub database_path: Option<PathBuf>,

    /// Describe incoming photos and keep them in history
    pub describe_images: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `RelayConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> RelayConfigFile {
    let Some(path) = config_file_path() else {
        return RelayConfigFile::default();
    };

    if !path.exists() {
        return RelayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                RelayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            RelayConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns [`crate::Error::Toml`] if the contents are not valid for the schema
pub fn parse_config_file(content: &str) -> Result<RelayConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/line-relay/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("line-relay").join("config.toml"))
}
