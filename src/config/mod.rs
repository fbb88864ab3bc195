//! Configuration module for the CRM voice gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//!
//! # Example
//! ```rust,no_run
//! use crmvoice_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::upstream::{
    DEFAULT_UPSTREAM_MODEL, OPENAI_REALTIME_URL, SessionSettings, UpstreamConfig, UpstreamVoice,
};
use crate::crm::CLOSE_API_BASE_URL;

mod yaml;

pub use yaml::YamlConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A configuration value is invalid
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway, including:
/// - Server settings (host, port, TLS)
/// - OpenAI Realtime API credentials and endpoint
/// - Close.com CRM credentials and endpoint
/// - Voice agent tuning (voice, instructions)
/// - Security settings (CORS)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// OpenAI API key for the Realtime API.
    /// Absence is not fatal at startup; it surfaces as an in-band error
    /// event when a client first tries to start a conversation.
    pub openai_api_key: Option<String>,
    /// Realtime API WebSocket endpoint (overridable for tests)
    pub upstream_url: String,
    /// Realtime model requested via the `model` query parameter
    pub upstream_model: String,

    /// Close.com API key
    pub crm_api_key: Option<String>,
    /// Close.com REST base URL (overridable for tests)
    pub crm_base_url: String,

    /// Voice used for audio output
    pub agent_voice: UpstreamVoice,
    /// System instructions override; the built-in CRM assistant
    /// instructions are used when unset
    pub agent_instructions: Option<String>,

    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

/// Implement Drop to zeroize secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.crm_api_key {
            key.zeroize();
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tls: None,
            openai_api_key: None,
            upstream_url: OPENAI_REALTIME_URL.to_string(),
            upstream_model: DEFAULT_UPSTREAM_MODEL.to_string(),
            crm_api_key: None,
            crm_base_url: CLOSE_API_BASE_URL.to_string(),
            agent_voice: UpstreamVoice::default(),
            agent_instructions: None,
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT must be a number, got '{port}'")))?;
        }
        config.openai_api_key = non_empty(std::env::var("OPENAI_API_KEY").ok());
        if let Some(url) = non_empty(std::env::var("OPENAI_REALTIME_URL").ok()) {
            config.upstream_url = url;
        }
        if let Some(model) = non_empty(std::env::var("OPENAI_REALTIME_MODEL").ok()) {
            config.upstream_model = model;
        }
        config.crm_api_key = non_empty(std::env::var("CLOSE_API_KEY").ok());
        if let Some(base) = non_empty(std::env::var("CLOSE_API_BASE_URL").ok()) {
            config.crm_base_url = base;
        }
        if let Some(voice) = non_empty(std::env::var("AGENT_VOICE").ok()) {
            config.agent_voice = UpstreamVoice::from_str_or_default(&voice);
        }
        config.agent_instructions = non_empty(std::env::var("AGENT_INSTRUCTIONS").ok());
        config.cors_allowed_origins = non_empty(std::env::var("CORS_ALLOWED_ORIGINS").ok());

        let cert = non_empty(std::env::var("TLS_CERT_PATH").ok());
        let key = non_empty(std::env::var("TLS_KEY_PATH").ok());
        config.tls = match (cert, key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert_path),
                key_path: PathBuf::from(key_path),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid(
                    "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
                ));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, with environment variables filling
    /// any field the file leaves unset.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let yaml: YamlConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_env()?;
        yaml.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Socket address string the server binds to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether TLS serving is enabled.
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Upstream connection parameters for a new session.
    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            api_key: self.openai_api_key.clone(),
            url: self.upstream_url.clone(),
            model: self.upstream_model.clone(),
        }
    }

    /// Session configuration sent once per upstream connection.
    pub fn session_settings(&self) -> SessionSettings {
        let mut settings = SessionSettings {
            voice: self.agent_voice,
            ..SessionSettings::default()
        };
        if let Some(ref instructions) = self.agent_instructions {
            settings.instructions = instructions.clone();
        }
        settings
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("PORT must be non-zero".to_string()));
        }
        if !self.upstream_url.starts_with("ws://") && !self.upstream_url.starts_with("wss://") {
            return Err(ConfigError::Invalid(format!(
                "upstream URL must be a ws:// or wss:// URL, got '{}'",
                self.upstream_url
            )));
        }
        if !self.crm_base_url.starts_with("http://") && !self.crm_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "CRM base URL must be an http:// or https:// URL, got '{}'",
                self.crm_base_url
            )));
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "HOST",
            "PORT",
            "OPENAI_API_KEY",
            "OPENAI_REALTIME_URL",
            "OPENAI_REALTIME_MODEL",
            "CLOSE_API_KEY",
            "CLOSE_API_BASE_URL",
            "AGENT_VOICE",
            "AGENT_INSTRUCTIONS",
            "CORS_ALLOWED_ORIGINS",
            "TLS_CERT_PATH",
            "TLS_KEY_PATH",
        ] {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.upstream_url, OPENAI_REALTIME_URL);
        assert_eq!(config.upstream_model, DEFAULT_UPSTREAM_MODEL);
        assert_eq!(config.crm_base_url, CLOSE_API_BASE_URL);
        assert!(!config.is_tls_enabled());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("HOST", "127.0.0.1");
            std::env::set_var("PORT", "9000");
            std::env::set_var("OPENAI_API_KEY", "sk-test");
            std::env::set_var("AGENT_VOICE", "shimmer");
        }
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.address(), "127.0.0.1:9000");
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.agent_voice, UpstreamVoice::Shimmer);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port() {
        clear_env();
        unsafe { std::env::set_var("PORT", "not-a-port") };
        assert!(ServerConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_tls_paths_must_be_paired() {
        clear_env();
        unsafe { std::env::set_var("TLS_CERT_PATH", "/tmp/cert.pem") };
        assert!(ServerConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "host: 127.0.0.1\nport: 9443\nopenai_api_key: sk-yaml\nagent_voice: echo\n",
        )
        .unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.address(), "127.0.0.1:9443");
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-yaml"));
        assert_eq!(config.agent_voice, UpstreamVoice::Echo);
    }

    #[test]
    #[serial]
    fn test_validate_rejects_bad_upstream_url() {
        clear_env();
        unsafe { std::env::set_var("OPENAI_REALTIME_URL", "https://api.openai.com") };
        assert!(ServerConfig::from_env().is_err());
        clear_env();
    }
}
