//! Upstream leg of the relay: the connection to the OpenAI Realtime API.
//!
//! # Architecture
//!
//! - [`UpstreamSession`] owns one WebSocket connection: handshake, the
//!   one-time session configuration, a pump task for both socket halves,
//!   and best-effort sends after teardown has begun.
//! - [`UpstreamEvent`] pairs each raw frame with a typed view used for
//!   logging and tool-call extraction; relay always uses the raw frame.
//! - [`UpstreamError`] is the connection-failure taxonomy. All three kinds
//!   are reported to the browser as in-band error events and never close
//!   the downstream connection.

use thiserror::Error;

mod config;
mod events;
mod session;

pub use config::{
    AudioFormat, DEFAULT_INSTRUCTIONS, DEFAULT_TRANSCRIPTION_MODEL, DEFAULT_UPSTREAM_MODEL,
    OPENAI_REALTIME_URL, SessionSettings, UpstreamConfig, UpstreamVoice, VadSettings,
};
pub use events::{
    ApiError, ClientEvent, ConversationItem, ResponseSummary, ServerEvent, SessionPayload,
    ToolInvocation, UpstreamEvent,
};
pub use session::UpstreamSession;

/// Errors establishing or configuring the upstream connection.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Missing credential; surfaced once per failed connect attempt
    #[error("{0}")]
    Config(String),

    /// The service rejected the credentials during the handshake
    #[error("{0}")]
    Auth(String),

    /// Network or protocol failure connecting or mid-stream
    #[error("upstream connection error: {0}")]
    Transport(String),
}
