//! Connect-time session configuration.
//!
//! [`SessionOptions`] is the immutable description of one session: identity
//! of the remote endpoint, assistant voice and instructions, transcription
//! and turn-detection settings, and the catalog of externally-implemented
//! tools the service may ask the client to invoke. It is captured once at
//! [`connect`](crate::session::VoiceSession::connect) time and serialized
//! into the `session.update` handshake.

use serde::{Deserialize, Serialize};

use crate::error::{VoiceError, VoiceResult};

/// Default realtime WebSocket endpoint.
pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Default realtime model.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";

/// Audio sample rate on both the wire and the devices, in Hz.
pub const WIRE_SAMPLE_RATE: u32 = 24_000;

/// Wire name of the fixed PCM audio format.
pub const WIRE_AUDIO_FORMAT: &str = "pcm16";

/// Immutable configuration for one voice session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    /// API key for authentication
    pub api_key: String,

    /// WebSocket endpoint base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier appended to the endpoint
    #[serde(default = "default_model")]
    pub model: String,

    /// Voice identity for audio output
    #[serde(default)]
    pub voice: Option<String>,

    /// Natural-language system instructions
    #[serde(default)]
    pub instructions: Option<String>,

    /// Model used to transcribe user speech (e.g. "whisper-1")
    #[serde(default)]
    pub transcription_model: Option<String>,

    /// Turn detection mode
    #[serde(default)]
    pub turn_detection: TurnDetectionMode,

    /// Externally-implemented tools the service may request
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

fn default_endpoint() -> String {
    DEFAULT_REALTIME_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_REALTIME_MODEL.to_string()
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_endpoint(),
            model: default_model(),
            voice: None,
            instructions: None,
            transcription_model: None,
            turn_detection: TurnDetectionMode::default(),
            tools: Vec::new(),
        }
    }
}

impl SessionOptions {
    /// Build options from the environment.
    ///
    /// Requires `OPENAI_API_KEY`; honors optional `VOICELINK_ENDPOINT`,
    /// `VOICELINK_MODEL` and `VOICELINK_VOICE` overrides. Call
    /// `dotenvy::dotenv()` first if a `.env` file should participate.
    pub fn from_env() -> VoiceResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            VoiceError::AuthenticationFailed("OPENAI_API_KEY is not set".to_string())
        })?;

        let mut options = Self {
            api_key,
            ..Default::default()
        };
        if let Ok(endpoint) = std::env::var("VOICELINK_ENDPOINT") {
            options.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("VOICELINK_MODEL") {
            options.model = model;
        }
        if let Ok(voice) = std::env::var("VOICELINK_VOICE") {
            options.voice = Some(voice);
        }
        Ok(options)
    }

    /// Validate fields that would otherwise only fail deep inside `connect`.
    pub fn validate(&self) -> VoiceResult<()> {
        if self.api_key.is_empty() {
            return Err(VoiceError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| VoiceError::InvalidConfiguration(format!("endpoint: {e}")))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(VoiceError::InvalidConfiguration(format!(
                "endpoint scheme must be ws or wss, got {}",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// Full WebSocket URL with the model query parameter.
    pub fn ws_url(&self) -> String {
        format!("{}?model={}", self.endpoint, self.model)
    }
}

/// One externally-implemented tool offered to the service.
///
/// The client only declares the catalog; execution happens in the external
/// orchestrator that consumes
/// [`SessionEvent::ToolCall`](crate::session::SessionEvent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name
    pub name: String,
    /// Free-text description shown to the model
    #[serde(default)]
    pub description: Option<String>,
    /// JSON-schema-shaped parameter description
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

/// How end-of-turn is decided.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TurnDetectionMode {
    /// Server-side voice activity detection
    #[default]
    ServerVad,
    /// No automatic turn detection; the caller commits the audio buffer
    Manual,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SessionOptions::default();
        assert_eq!(options.endpoint, DEFAULT_REALTIME_URL);
        assert_eq!(options.model, DEFAULT_REALTIME_MODEL);
        assert!(options.tools.is_empty());
        assert!(matches!(
            options.turn_detection,
            TurnDetectionMode::ServerVad
        ));
    }

    #[test]
    fn test_validate_requires_api_key() {
        let options = SessionOptions::default();
        assert!(matches!(
            options.validate(),
            Err(VoiceError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_ws_endpoint() {
        let options = SessionOptions {
            api_key: "key".to_string(),
            endpoint: "https://api.example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(VoiceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_ws_url_includes_model() {
        let options = SessionOptions {
            api_key: "key".to_string(),
            model: "gpt-4o-realtime-preview".to_string(),
            ..Default::default()
        };
        assert!(options.validate().is_ok());
        assert_eq!(
            options.ws_url(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview"
        );
    }
}
