//! Voice relay WebSocket route configuration
//!
//! # Endpoint
//!
//! `GET /ws/voice` - WebSocket upgrade for the browser ⇄ realtime API relay
//!
//! # Protocol
//!
//! After the upgrade, clients send realtime-API JSON frames (typically
//! `input_audio_buffer.append`); the first frame triggers the upstream
//! connection. The server relays every upstream event back verbatim and
//! emits `{"type": "error", "error": "..."}` when the upstream leg fails.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::voice_handler;
use crate::state::AppState;

/// Create the voice relay router
pub fn create_voice_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/voice", get(voice_handler))
        .layer(TraceLayer::new_for_http())
}
