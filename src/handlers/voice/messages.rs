//! Downstream (browser-facing) message types.
//!
//! The bridge imposes no schema of its own on client traffic — frames are
//! relayed verbatim in both directions. The only messages minted here are
//! the in-band error events the client sees when the upstream leg fails.

use serde::Serialize;

/// Events the gateway itself sends to the browser.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum DownstreamEvent {
    /// Upstream-leg failure surfaced in-band; the connection stays open
    #[serde(rename = "error")]
    Error {
        /// Human-readable failure description
        error: String,
    },
}

/// Frame routing toward the client socket.
#[derive(Debug)]
pub enum OutboundFrame {
    /// Raw upstream frame relayed verbatim
    Relay(String),
    /// Gateway-minted event
    Event(DownstreamEvent),
    /// Close the connection
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_wire_shape() {
        let event = DownstreamEvent::Error {
            error: "OPENAI_API_KEY is not configured".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"], "OPENAI_API_KEY is not configured");
    }
}
