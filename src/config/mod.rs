//! Configuration management for the relay
//!
//! Values are layered env > TOML file > default.

pub mod file;

use std::path::PathBuf;

use secrecy::SecretString;

use crate::{Error, Result};

/// Default webhook port
pub const DEFAULT_PORT: u16 = 5000;

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Relay configuration
#[derive(Debug)]
pub struct Config {
    /// LINE channel credentials
    pub line: LineConfig,

    /// Gemini credentials and model
    pub gemini: GeminiConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// History database path; `None` runs the stateless relay
    pub database_path: Option<PathBuf>,

    /// Describe incoming photos and keep them in history
    pub describe_images: bool,
}

/// LINE Messaging API credentials
#[derive(Debug)]
pub struct LineConfig {
    /// Channel access token (bearer for outbound calls)
    pub channel_token: SecretString,

    /// Channel secret (webhook signature key)
    pub channel_secret: SecretString,
}

/// Gemini API configuration
#[derive(Debug)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment and the optional config file
    ///
    /// # Errors
    ///
    /// Returns error if a required credential is missing
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Build configuration from an env lookup and a parsed config file
    ///
    /// # Errors
    ///
    /// Returns error if a required credential is missing or a value is malformed
    pub fn from_sources<F>(env: F, fc: file::RelayConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let channel_token = non_empty("LINE_CHANNEL_TOKEN")
            .or(fc.line.channel_token)
            .ok_or_else(|| Error::Config("LINE_CHANNEL_TOKEN is not set".to_string()))?;
        let channel_secret = non_empty("LINE_CHANNEL_SECRET")
            .or(fc.line.channel_secret)
            .ok_or_else(|| Error::Config("LINE_CHANNEL_SECRET is not set".to_string()))?;
        let api_key = non_empty("GEMINI_API_KEY")
            .or(fc.gemini.api_key)
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".to_string()))?;

        let model = non_empty("GEMINI_MODEL")
            .or(fc.gemini.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::Config(format!("invalid PORT {raw:?}: {e}")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };

        let database_path = non_empty("DATABASE_PATH")
            .map(PathBuf::from)
            .or(fc.server.database_path);

        let describe_images = non_empty("DESCRIBE_IMAGES")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .or(fc.server.describe_images)
            .unwrap_or(false);

        Ok(Self {
            line: LineConfig {
                channel_token: SecretString::from(channel_token),
                channel_secret: SecretString::from(channel_secret),
            },
            gemini: GeminiConfig {
                api_key: SecretString::from(api_key),
                model,
            },
            server: ServerConfig { port },
            database_path,
            describe_images,
        })
    }
}
