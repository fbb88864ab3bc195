//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::crm::{CrmClient, CrmConfig};
use crate::tools::ToolRegistry;

/// State shared by every connection: the configuration and the immutable
/// tool dispatch table. Everything per-conversation lives in the
/// connection handler instead.
pub struct AppState {
    pub config: ServerConfig,
    pub tools: Arc<ToolRegistry>,
}

impl AppState {
    /// Build the application state, wiring the CRM client into the tool
    /// registry.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let crm = Arc::new(CrmClient::new(CrmConfig {
            api_key: config.crm_api_key.clone(),
            base_url: config.crm_base_url.clone(),
        }));
        let tools = Arc::new(ToolRegistry::with_crm_tools(crm));
        Arc::new(Self { config, tools })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wires_tool_registry() {
        let state = AppState::new(ServerConfig::default());
        assert_eq!(state.tools.len(), 10);
    }
}
