pub mod config;
pub mod core;
pub mod crm;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod tools;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::upstream::{UpstreamError, UpstreamSession};
pub use crm::{CrmClient, CrmError};
pub use state::AppState;
pub use tools::ToolRegistry;
