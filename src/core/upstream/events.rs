//! OpenAI Realtime API WebSocket event types.
//!
//! Client events are the small set the bridge itself produces; everything a
//! browser sends is relayed as-is and never re-encoded here. Server events
//! are parsed for recognition only — the raw frame is always what gets
//! relayed to the client, so a frame that fails typed parsing is still
//! forwarded untouched.
//!
//! # Protocol Overview
//!
//! Client events (sent to the service):
//! - session.update - Send the one-time session configuration
//! - conversation.item.create - Inject a function call result
//! - response.create - Ask the model to continue after a tool result
//!
//! Server events (recognized on receive):
//! - session.created / session.updated
//! - response.created / response.done
//! - response.audio.delta
//! - input_audio_buffer.speech_started / speech_stopped
//! - conversation.item.input_audio_transcription.completed
//! - response.audio_transcript.done
//! - response.function_call_arguments.done - carries a tool invocation
//! - error

use serde::{Deserialize, Serialize};

use super::config::SessionSettings;
use crate::tools::ToolDef;

// =============================================================================
// Session Configuration Payload
// =============================================================================

/// `session` object inside a `session.update` event.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPayload {
    pub modalities: Vec<String>,
    pub instructions: String,
    pub voice: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub input_audio_transcription: TranscriptionPayload,
    pub turn_detection: TurnDetectionPayload,
    pub tools: Vec<ToolDef>,
    pub tool_choice: String,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionPayload {
    pub model: String,
}

/// Turn detection configuration (server-side VAD).
#[derive(Debug, Clone, Serialize)]
pub struct TurnDetectionPayload {
    #[serde(rename = "type")]
    pub detection_type: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl SessionPayload {
    /// Build the payload from settings plus the advertised tool schema.
    pub fn new(settings: &SessionSettings, tools: Vec<ToolDef>) -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: settings.instructions.clone(),
            voice: settings.voice.as_str().to_string(),
            input_audio_format: settings.audio_format.as_str().to_string(),
            output_audio_format: settings.audio_format.as_str().to_string(),
            input_audio_transcription: TranscriptionPayload {
                model: settings.transcription_model.clone(),
            },
            turn_detection: TurnDetectionPayload {
                detection_type: "server_vad".to_string(),
                threshold: settings.vad.threshold,
                prefix_padding_ms: settings.vad.prefix_padding_ms,
                silence_duration_ms: settings.vad.silence_duration_ms,
            },
            tools,
            tool_choice: "auto".to_string(),
        }
    }
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item injected by the bridge.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub call_id: String,
    pub output: String,
}

impl ConversationItem {
    /// A `function_call_output` item answering one tool invocation.
    pub fn function_call_output(call_id: &str, output: &str) -> Self {
        Self {
            item_type: "function_call_output".to_string(),
            call_id: call_id.to_string(),
            output: output.to_string(),
        }
    }
}

// =============================================================================
// Client Events (sent to the service)
// =============================================================================

/// Client events the bridge sends to the Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Send the session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionPayload,
    },

    /// Inject a conversation item (function call result)
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Ask the model to generate a response
    #[serde(rename = "response.create")]
    ResponseCreate,
}

// =============================================================================
// Server Events (received from the service)
// =============================================================================

/// Server events the bridge recognizes. Fields the bridge does not use are
/// left out; serde ignores them on deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {},

    /// Session configuration acknowledged
    #[serde(rename = "session.updated")]
    SessionUpdated {},

    /// Speech detection started
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Audio start timestamp in ms
        #[serde(default)]
        audio_start_ms: u64,
    },

    /// Speech detection stopped
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        /// Audio end timestamp in ms
        #[serde(default)]
        audio_end_ms: u64,
    },

    /// Input audio transcription completed
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        /// Transcript text
        #[serde(default)]
        transcript: String,
    },

    /// Assistant audio transcript done
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        /// Full transcript
        #[serde(default)]
        transcript: String,
    },

    /// Audio data chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {},

    /// Response generation started
    #[serde(rename = "response.created")]
    ResponseCreated {},

    /// Response complete
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response information
        #[serde(default)]
        response: ResponseSummary,
    },

    /// Function call arguments complete - carries a tool invocation
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        /// Call ID for the function call
        call_id: String,
        /// Function name
        #[serde(default)]
        name: String,
        /// JSON-encoded arguments object
        arguments: String,
    },
}

/// API error information.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(default, rename = "type")]
    pub error_type: String,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// Response information from `response.done`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseSummary {
    /// Response ID
    #[serde(default)]
    pub id: String,
    /// Token usage
    #[serde(default)]
    pub usage: Option<serde_json::Value>,
}

// =============================================================================
// Tool Invocations
// =============================================================================

/// A completed function call extracted from the upstream stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Call ID the result must echo
    pub call_id: String,
    /// Tool name
    pub name: String,
    /// JSON-encoded arguments object
    pub arguments: String,
}

// =============================================================================
// Upstream Event Wrapper
// =============================================================================

/// One upstream frame: the raw text (relayed verbatim) plus the recognized
/// event, when the frame matched a known type.
#[derive(Debug)]
pub struct UpstreamEvent {
    /// Raw JSON frame as received
    pub raw: String,
    /// Typed view, `None` for unrecognized or malformed frames
    pub event: Option<ServerEvent>,
}

impl UpstreamEvent {
    /// Parse a raw frame. Unrecognized event types are not an error; the
    /// frame is still relayed, only the typed view is absent.
    pub fn parse(raw: String) -> Self {
        let event = serde_json::from_str::<ServerEvent>(&raw).ok();
        Self { raw, event }
    }

    /// Extract the tool invocation, if this frame carries one.
    pub fn tool_invocation(&self) -> Option<ToolInvocation> {
        match &self.event {
            Some(ServerEvent::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            }) => Some(ToolInvocation {
                call_id: call_id.clone(),
                name: name.clone(),
                arguments: arguments.clone(),
            }),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::upstream::config::SessionSettings;

    #[test]
    fn test_session_update_serialization() {
        let settings = SessionSettings::default();
        let event = ClientEvent::SessionUpdate {
            session: SessionPayload::new(&settings, Vec::new()),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "session.update");
        assert_eq!(json["session"]["modalities"], serde_json::json!(["text", "audio"]));
        assert_eq!(json["session"]["voice"], "alloy");
        assert_eq!(json["session"]["input_audio_format"], "pcm16");
        assert_eq!(json["session"]["input_audio_transcription"]["model"], "whisper-1");
        assert_eq!(json["session"]["turn_detection"]["type"], "server_vad");
        assert_eq!(json["session"]["turn_detection"]["threshold"], 0.5);
        assert_eq!(json["session"]["turn_detection"]["prefix_padding_ms"], 300);
        assert_eq!(json["session"]["turn_detection"]["silence_duration_ms"], 500);
        assert_eq!(json["session"]["tool_choice"], "auto");
    }

    #[test]
    fn test_function_call_output_serialization() {
        let event = ClientEvent::ConversationItemCreate {
            item: ConversationItem::function_call_output("c1", "Lead found"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "conversation.item.create");
        assert_eq!(json["item"]["type"], "function_call_output");
        assert_eq!(json["item"]["call_id"], "c1");
        assert_eq!(json["item"]["output"], "Lead found");
    }

    #[test]
    fn test_response_create_serialization() {
        let json = serde_json::to_string(&ClientEvent::ResponseCreate).unwrap();
        assert_eq!(json, r#"{"type":"response.create"}"#);
    }

    #[test]
    fn test_tool_invocation_extraction() {
        let raw = r#"{"type":"response.function_call_arguments.done","call_id":"c1","name":"get_lead_details","arguments":"{\"lead_id\":\"42\"}"}"#;
        let event = UpstreamEvent::parse(raw.to_string());
        let invocation = event.tool_invocation().expect("should carry an invocation");
        assert_eq!(invocation.call_id, "c1");
        assert_eq!(invocation.name, "get_lead_details");
        assert_eq!(invocation.arguments, r#"{"lead_id":"42"}"#);
    }

    #[test]
    fn test_unrecognized_event_still_relayable() {
        let raw = r#"{"type":"rate_limits.updated","rate_limits":[]}"#;
        let event = UpstreamEvent::parse(raw.to_string());
        assert!(event.event.is_none());
        assert!(event.tool_invocation().is_none());
        assert_eq!(event.raw, raw);
    }

    #[test]
    fn test_error_event_parse() {
        let raw = r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#;
        let event = UpstreamEvent::parse(raw.to_string());
        match event.event {
            Some(ServerEvent::Error { error }) => {
                assert_eq!(error.error_type, "invalid_request_error");
                assert_eq!(error.message, "bad");
            }
            other => panic!("expected error event, got {other:?}"),
        }
    }

    #[test]
    fn test_known_event_with_extra_fields() {
        let raw = r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":120,"item_id":"item_1"}"#;
        let event = UpstreamEvent::parse(raw.to_string());
        match event.event {
            Some(ServerEvent::SpeechStarted { audio_start_ms }) => {
                assert_eq!(audio_start_ms, 120);
            }
            other => panic!("expected speech_started, got {other:?}"),
        }
    }

    #[test]
    fn test_response_done_usage() {
        let raw = r#"{"type":"response.done","response":{"id":"resp_1","status":"completed","usage":{"total_tokens":10}}}"#;
        let event = UpstreamEvent::parse(raw.to_string());
        match event.event {
            Some(ServerEvent::ResponseDone { response }) => {
                assert_eq!(response.id, "resp_1");
                assert!(response.usage.is_some());
            }
            other => panic!("expected response.done, got {other:?}"),
        }
    }
}
