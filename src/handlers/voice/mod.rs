//! Voice relay WebSocket handlers.
//!
//! # Protocol
//!
//! The gateway relays raw JSON frames between the browser and the realtime
//! API in both directions. The browser speaks the realtime event schema
//! directly (e.g. `input_audio_buffer.append`); the gateway adds only:
//!
//! - the one-time session configuration sent upstream on connect
//! - interception of completed function calls, answered with a
//!   `function_call_output` item followed by `response.create`
//! - `{"type": "error", "error": "..."}` events when the upstream leg fails

mod bridge;
pub mod messages;

pub use bridge::voice_handler;
