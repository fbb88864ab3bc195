//! OpenAI Realtime API configuration types.
//!
//! This module contains configuration types for the upstream connection:
//! - Endpoint and model selection
//! - Voice selection
//! - Audio format configuration
//! - Session settings (instructions, transcription, turn detection)

use serde::{Deserialize, Serialize};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Default realtime model requested via the `model` query parameter.
pub const DEFAULT_UPSTREAM_MODEL: &str = "gpt-realtime";

/// Default transcription model for input audio.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Built-in system instructions for the CRM voice assistant.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful CRM voice assistant. \
     You can search for leads, get their details, create new leads, and add notes. \
     You can also create opportunities and update lead descriptions. \
     When adding a note, be concise. \
     Always ask for clarification if multiple leads match a search.";

// =============================================================================
// Connection Parameters
// =============================================================================

/// Parameters for dialing the upstream service.
///
/// Passed in explicitly by the session owner; the upstream layer never
/// reads process-global state.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// API key; `None` is rejected before any dial is attempted
    pub api_key: Option<String>,
    /// WebSocket endpoint
    pub url: String,
    /// Model appended as the `model` query parameter
    pub model: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: OPENAI_REALTIME_URL.to_string(),
            model: DEFAULT_UPSTREAM_MODEL.to_string(),
        }
    }
}

// =============================================================================
// Voices
// =============================================================================

/// Available voices for the Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamVoice {
    /// Alloy voice (default)
    #[default]
    Alloy,
    /// Ash voice
    Ash,
    /// Ballad voice
    Ballad,
    /// Coral voice
    Coral,
    /// Echo voice
    Echo,
    /// Sage voice
    Sage,
    /// Shimmer voice
    Shimmer,
    /// Verse voice
    Verse,
}

impl UpstreamVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alloy" => Self::Alloy,
            "ash" => Self::Ash,
            "ballad" => Self::Ballad,
            "coral" => Self::Coral,
            "echo" => Self::Echo,
            "sage" => Self::Sage,
            "shimmer" => Self::Shimmer,
            "verse" => Self::Verse,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for UpstreamVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Supported audio formats for the Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// PCM 16-bit signed little-endian (default)
    #[default]
    Pcm16,
    /// G.711 u-law (8-bit)
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
    /// G.711 a-law (8-bit)
    #[serde(rename = "g711_alaw")]
    G711Alaw,
}

impl AudioFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::G711Ulaw => "g711_ulaw",
            Self::G711Alaw => "g711_alaw",
        }
    }

    /// Get the sample rate for this format.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Pcm16 => 24000,
            Self::G711Ulaw | Self::G711Alaw => 8000,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Session Settings
// =============================================================================

/// Server-side voice activity detection tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadSettings {
    /// Activation threshold (0.0 to 1.0)
    pub threshold: f32,
    /// Amount of audio to include before voice detection (ms)
    pub prefix_padding_ms: u32,
    /// Silence duration before end of turn (ms)
    pub silence_duration_ms: u32,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// Immutable session descriptor serialized once per upstream connection.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// System instructions for the assistant
    pub instructions: String,
    /// Voice for audio output
    pub voice: UpstreamVoice,
    /// Input/output audio format
    pub audio_format: AudioFormat,
    /// Transcription model for input audio
    pub transcription_model: String,
    /// Turn detection tuning
    pub vad: VadSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            voice: UpstreamVoice::default(),
            audio_format: AudioFormat::default(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            vad: VadSettings::default(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
