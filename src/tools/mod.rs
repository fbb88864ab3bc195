//! Tool registry for the voice agent.
//!
//! Maps tool names to async handlers with a declared argument schema.
//! Adding a tool means registering an entry; the registry is built once at
//! startup and shared immutably by every session.
//!
//! `dispatch` is total: unknown names, missing arguments, and remote CRM
//! failures all come back as error-describing strings, because the upstream
//! service expects every function call to be answered with a textual output.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::crm::CrmClient;

mod catalog;

/// Result returned when a tool name is not registered.
pub const TOOL_NOT_FOUND: &str = "Error: Tool not found";

/// Decoded arguments object of one tool invocation.
pub type ToolArguments = Map<String, Value>;

/// Tool definition advertised to the upstream service.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// JSON schema for parameters, including the required-field list
    pub parameters: Value,
}

impl ToolDef {
    /// A `function` tool with the given JSON-schema parameters.
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

type ToolFuture = Pin<Box<dyn Future<Output = String> + Send>>;

/// Async handler executing one tool invocation against the CRM.
pub type ToolHandler = Box<dyn Fn(Arc<CrmClient>, ToolArguments) -> ToolFuture + Send + Sync>;

/// One registered tool: its advertised definition plus its handler.
pub struct ToolEntry {
    def: ToolDef,
    handler: ToolHandler,
}

/// Immutable name-to-handler dispatch table.
pub struct ToolRegistry {
    crm: Arc<CrmClient>,
    entries: Vec<ToolEntry>,
}

impl ToolRegistry {
    /// Create an empty registry over the given CRM client.
    pub fn new(crm: Arc<CrmClient>) -> Self {
        Self {
            crm,
            entries: Vec::new(),
        }
    }

    /// Create a registry with the full CRM tool set installed.
    pub fn with_crm_tools(crm: Arc<CrmClient>) -> Self {
        let mut registry = Self::new(crm);
        catalog::install(&mut registry);
        registry
    }

    /// Register a tool. Registration order is the order tools are
    /// advertised in the session configuration.
    pub fn register(&mut self, def: ToolDef, handler: ToolHandler) {
        self.entries.push(ToolEntry { def, handler });
    }

    /// Definitions for the session configuration payload.
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.entries.iter().map(|entry| entry.def.clone()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execute a tool by name. Always returns a textual result.
    pub async fn dispatch(&self, name: &str, arguments: &ToolArguments) -> String {
        let Some(entry) = self.entries.iter().find(|entry| entry.def.name == name) else {
            warn!(tool = name, "unknown tool requested");
            return TOOL_NOT_FOUND.to_string();
        };

        info!(tool = name, "executing tool");
        (entry.handler)(self.crm.clone(), arguments.clone()).await
    }
}

/// Extract a string argument.
fn str_arg(args: &ToolArguments, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Extract an integer argument.
fn int_arg(args: &ToolArguments, key: &str) -> Option<i64> {
    args.get(key).and_then(Value::as_i64)
}

/// Error text for a missing required argument.
fn missing_argument(key: &str) -> String {
    format!("Error: missing required argument '{key}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::CrmConfig;

    fn empty_registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(CrmClient::new(CrmConfig::default())))
    }

    #[tokio::test]
    async fn test_unknown_tool_returns_literal() {
        let registry = empty_registry();
        let result = registry.dispatch("does_not_exist", &ToolArguments::new()).await;
        assert_eq!(result, TOOL_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_registered_handler_runs() {
        let mut registry = empty_registry();
        registry.register(
            ToolDef::function("echo", "Echo back.", serde_json::json!({"type": "object"})),
            Box::new(|_crm, args| {
                Box::pin(async move {
                    str_arg(&args, "text").unwrap_or_else(|| missing_argument("text"))
                })
            }),
        );

        let mut args = ToolArguments::new();
        args.insert("text".to_string(), Value::String("hi".to_string()));
        assert_eq!(registry.dispatch("echo", &args).await, "hi");
        assert_eq!(
            registry.dispatch("echo", &ToolArguments::new()).await,
            "Error: missing required argument 'text'"
        );
    }

    #[test]
    fn test_argument_extraction() {
        let mut args = ToolArguments::new();
        args.insert("name".to_string(), Value::String("acme".to_string()));
        args.insert("limit".to_string(), Value::from(25));
        args.insert("flag".to_string(), Value::Bool(true));

        assert_eq!(str_arg(&args, "name").as_deref(), Some("acme"));
        assert_eq!(int_arg(&args, "limit"), Some(25));
        assert_eq!(str_arg(&args, "limit"), None);
        assert_eq!(int_arg(&args, "flag"), None);
        assert_eq!(str_arg(&args, "absent"), None);
    }
}
