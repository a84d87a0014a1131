//! Wire message types for the realtime speech protocol.
//!
//! All events are JSON objects tagged by a `type` field and sent as text
//! frames over the WebSocket.
//!
//! # Protocol Overview
//!
//! Client events (sent to the service):
//! - `session.update` - Declare the session configuration, once per connection
//! - `input_audio_buffer.append` - One base64 PCM16 capture frame
//! - `input_audio_buffer.commit` - Commit the audio buffer (manual turn mode)
//! - `input_audio_buffer.clear` - Discard the uncommitted audio buffer
//! - `conversation.item.create` - Inject an out-of-band item (user text)
//! - `response.cancel` - Cancel the in-flight response
//!
//! Server events (received from the service):
//! - `session.created` - Session established
//! - `response.audio.delta` - Base64 PCM16 audio chunk
//! - `response.text.delta` - UTF-8 text fragment
//! - `response.audio_transcript.delta` / `.done` - Assistant speech transcript stream
//! - `response.output_item.added` - Structured output item (message or function call)
//! - `response.done` - Response complete
//! - `conversation.item.input_audio_transcription.completed` - User speech transcript
//! - `response.function_call_arguments.done` - Tool invocation request complete
//! - `input_audio_buffer.speech_started` / `speech_stopped` - Server VAD markers
//! - `error` - Non-fatal service error
//!
//! Unknown `type` tags deserialize to [`ServerEvent::Unknown`] so protocol
//! additions never break the session.

use serde::{Deserialize, Serialize};

use super::config::{SessionOptions, TurnDetectionMode, WIRE_AUDIO_FORMAT};

// =============================================================================
// Session configuration
// =============================================================================

/// Handshake payload carried by `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Tool catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
}

impl SessionConfig {
    /// Build the handshake payload from connect-time options.
    pub fn from_options(options: &SessionOptions) -> Self {
        Self {
            modalities: Some(vec!["text".to_string(), "audio".to_string()]),
            instructions: options.instructions.clone(),
            voice: options.voice.clone(),
            input_audio_format: Some(WIRE_AUDIO_FORMAT.to_string()),
            output_audio_format: Some(WIRE_AUDIO_FORMAT.to_string()),
            input_audio_transcription: options.transcription_model.as_ref().map(|model| {
                InputAudioTranscription {
                    model: model.clone(),
                }
            }),
            turn_detection: Some(match options.turn_detection {
                TurnDetectionMode::ServerVad => TurnDetection::ServerVad {},
                TurnDetectionMode::Manual => TurnDetection::None {},
            }),
            tools: if options.tools.is_empty() {
                None
            } else {
                Some(
                    options
                        .tools
                        .iter()
                        .map(|t| ToolDef {
                            tool_type: "function".to_string(),
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        })
                        .collect(),
                )
            },
        }
    }
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g. "whisper-1")
    pub model: String,
}

/// Turn detection configuration on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD with service defaults
    #[serde(rename = "server_vad")]
    ServerVad {},
    /// No automatic turn detection
    #[serde(rename = "none")]
    None {},
}

/// Tool definition on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Function parameters JSON schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// =============================================================================
// Conversation items
// =============================================================================

/// Conversation item, used both for outbound `conversation.item.create` and
/// inside inbound `response.output_item.added`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type (message, function_call)
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item role (user, assistant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
    /// Call ID for function-call items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Function name for function-call items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function arguments for function-call items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ConversationItem {
    /// A user text message item.
    pub fn user_text(text: &str) -> Self {
        Self {
            id: None,
            item_type: "message".to_string(),
            role: Some("user".to_string()),
            content: Some(vec![ContentPart {
                content_type: "input_text".to_string(),
                text: Some(text.to_string()),
                transcript: None,
            }]),
            call_id: None,
            name: None,
            arguments: None,
        }
    }

    /// Concatenate the textual fragments of this item's content parts.
    ///
    /// Message items may carry several fragments; audio parts contribute
    /// their transcript. Returns `None` when no text is present.
    pub fn joined_text(&self) -> Option<String> {
        let parts = self.content.as_ref()?;
        let mut joined = String::new();
        for part in parts {
            if let Some(text) = part.text.as_deref().or(part.transcript.as_deref()) {
                joined.push_str(text);
            }
        }
        if joined.is_empty() { None } else { Some(joined) }
    }
}

/// Content part within a conversation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (input_text, text, audio)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Transcript of audio content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

// =============================================================================
// Client events (sent to the service)
// =============================================================================

/// Client events sent over the channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Declare the session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append one capture frame to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded PCM16 audio
        audio: String,
    },

    /// Commit the input audio buffer
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Clear the input audio buffer
    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear,

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Cancel the in-flight response
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

// =============================================================================
// Server events (received from the service)
// =============================================================================

/// Server events received over the channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred; never fatal to the session by itself
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session established
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: SessionInfo,
    },

    /// Speech detected in the input buffer
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Audio start timestamp in ms
        #[serde(default)]
        audio_start_ms: u64,
    },

    /// Silence detected in the input buffer
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        /// Audio end timestamp in ms
        #[serde(default)]
        audio_end_ms: u64,
    },

    /// User speech transcription completed
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
        /// Transcript text
        transcript: String,
    },

    /// Audio data chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Base64-encoded PCM16 audio delta
        delta: String,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
    },

    /// Text fragment
    #[serde(rename = "response.text.delta")]
    TextDelta {
        /// Text delta
        delta: String,
    },

    /// Assistant speech transcript fragment
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        /// Transcript delta
        delta: String,
    },

    /// Assistant speech transcript complete
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        /// Full transcript
        transcript: String,
    },

    /// Output item added to the response
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        /// The item
        item: ConversationItem,
    },

    /// Tool invocation request complete
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        /// Function name
        name: String,
        /// Call ID
        #[serde(default)]
        call_id: Option<String>,
        /// Full arguments as a JSON string
        arguments: String,
    },

    /// Response complete
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response summary
        #[serde(default)]
        response: Option<ResponseSummary>,
    },

    /// Any message kind this client does not handle
    #[serde(other)]
    Unknown,
}

// =============================================================================
// Supporting types
// =============================================================================

/// Error information from the service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// Session information from `session.created`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    /// Session ID
    #[serde(default)]
    pub id: String,
    /// Model in use
    #[serde(default)]
    pub model: Option<String>,
}

/// Response summary from `response.done`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseSummary {
    /// Response ID
    #[serde(default)]
    pub id: String,
    /// Response status
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::config::ToolSpec;

    #[test]
    fn test_client_event_tags() {
        let json = serde_json::to_string(&ClientEvent::InputAudioBufferCommit).unwrap();
        assert!(json.contains("input_audio_buffer.commit"));

        let json = serde_json::to_string(&ClientEvent::ResponseCancel).unwrap();
        assert!(json.contains("response.cancel"));

        let json = serde_json::to_string(&ClientEvent::InputAudioBufferAppend {
            audio: "AAAA".to_string(),
        })
        .unwrap();
        assert!(json.contains("input_audio_buffer.append"));
        assert!(json.contains("AAAA"));
    }

    #[test]
    fn test_session_update_from_options() {
        let options = SessionOptions {
            api_key: "key".to_string(),
            voice: Some("sage".to_string()),
            instructions: Some("Be brief.".to_string()),
            transcription_model: Some("whisper-1".to_string()),
            tools: vec![ToolSpec {
                name: "generate_image".to_string(),
                description: Some("Render an image".to_string()),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {"prompt": {"type": "string"}}
                })),
            }],
            ..Default::default()
        };

        let event = ClientEvent::SessionUpdate {
            session: SessionConfig::from_options(&options),
        };
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("session.update"));
        assert!(json.contains("sage"));
        assert!(json.contains("whisper-1"));
        assert!(json.contains("generate_image"));
        assert!(json.contains("pcm16"));
        assert!(json.contains("server_vad"));
    }

    #[test]
    fn test_manual_turn_detection_serializes_as_none() {
        let options = SessionOptions {
            api_key: "key".to_string(),
            turn_detection: TurnDetectionMode::Manual,
            ..Default::default()
        };
        let json = serde_json::to_string(&SessionConfig::from_options(&options)).unwrap();
        assert!(json.contains(r#""turn_detection":{"type":"none"}"#));
    }

    #[test]
    fn test_server_event_audio_delta() {
        let json = r#"{"type":"response.audio.delta","delta":"UklGRg==","item_id":"item_1","response_id":"resp_1"}"#;
        match serde_json::from_str::<ServerEvent>(json).unwrap() {
            ServerEvent::AudioDelta { delta, item_id, .. } => {
                assert_eq!(delta, "UklGRg==");
                assert_eq!(item_id.as_deref(), Some("item_1"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_server_event_function_call_done() {
        let json = r#"{
            "type": "response.function_call_arguments.done",
            "name": "generate_image",
            "call_id": "call_7",
            "arguments": "{\"prompt\": \"a fox\"}"
        }"#;
        match serde_json::from_str::<ServerEvent>(json).unwrap() {
            ServerEvent::FunctionCallArgumentsDone {
                name,
                call_id,
                arguments,
            } => {
                assert_eq!(name, "generate_image");
                assert_eq!(call_id.as_deref(), Some("call_7"));
                assert!(arguments.contains("fox"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_kind_tolerated() {
        let json = r#"{"type":"rate_limits.updated","rate_limits":[]}"#;
        assert!(matches!(
            serde_json::from_str::<ServerEvent>(json).unwrap(),
            ServerEvent::Unknown
        ));
    }

    #[test]
    fn test_joined_text_concatenates_fragments() {
        let item = ConversationItem {
            id: None,
            item_type: "message".to_string(),
            role: Some("assistant".to_string()),
            content: Some(vec![
                ContentPart {
                    content_type: "text".to_string(),
                    text: Some("Hello, ".to_string()),
                    transcript: None,
                },
                ContentPart {
                    content_type: "audio".to_string(),
                    text: None,
                    transcript: Some("world.".to_string()),
                },
            ]),
            call_id: None,
            name: None,
            arguments: None,
        };
        assert_eq!(item.joined_text().as_deref(), Some("Hello, world."));
    }

    #[test]
    fn test_user_text_item_shape() {
        let json = serde_json::to_string(&ClientEvent::ConversationItemCreate {
            item: ConversationItem::user_text("hi there"),
        })
        .unwrap();
        assert!(json.contains("conversation.item.create"));
        assert!(json.contains("input_text"));
        assert!(json.contains("hi there"));
    }
}
