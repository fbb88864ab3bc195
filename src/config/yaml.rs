//! YAML configuration file loading
//!
//! Every field is optional; unset fields keep the value already resolved
//! from environment variables or defaults.

use std::path::PathBuf;

use serde::Deserialize;

use super::{ServerConfig, TlsConfig};
use crate::core::upstream::UpstreamVoice;

/// YAML representation of the server configuration.
///
/// # Example
/// ```yaml
/// host: 0.0.0.0
/// port: 8080
/// openai_api_key: sk-...
/// close_api_key: api_...
/// agent_voice: alloy
/// cors_allowed_origins: "*"
/// tls:
///   cert_path: /etc/ssl/cert.pem
///   key_path: /etc/ssl/key.pem
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub openai_api_key: Option<String>,
    pub openai_realtime_url: Option<String>,
    pub openai_realtime_model: Option<String>,
    pub close_api_key: Option<String>,
    pub close_api_base_url: Option<String>,
    pub agent_voice: Option<String>,
    pub agent_instructions: Option<String>,
    pub cors_allowed_origins: Option<String>,
    pub tls: Option<YamlTlsConfig>,
}

/// YAML TLS section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlTlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl YamlConfig {
    /// Overlay the YAML values onto an already-resolved configuration.
    pub(super) fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(key) = self.openai_api_key {
            config.openai_api_key = Some(key);
        }
        if let Some(url) = self.openai_realtime_url {
            config.upstream_url = url;
        }
        if let Some(model) = self.openai_realtime_model {
            config.upstream_model = model;
        }
        if let Some(key) = self.close_api_key {
            config.crm_api_key = Some(key);
        }
        if let Some(base) = self.close_api_base_url {
            config.crm_base_url = base;
        }
        if let Some(voice) = self.agent_voice {
            config.agent_voice = UpstreamVoice::from_str_or_default(&voice);
        }
        if let Some(instructions) = self.agent_instructions {
            config.agent_instructions = Some(instructions);
        }
        if let Some(origins) = self.cors_allowed_origins {
            config.cors_allowed_origins = Some(origins);
        }
        if let Some(tls) = self.tls {
            config.tls = Some(TlsConfig {
                cert_path: tls.cert_path,
                key_path: tls.key_path,
            });
        }
    }
}
