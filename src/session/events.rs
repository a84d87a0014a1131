//! Typed events delivered to the external orchestrator.
//!
//! All session output flows through one [`SessionEvent`] enum on a single
//! channel, so consumers observe text, connection, tool-call and transcript
//! activity in one ordered stream instead of wiring up independent
//! callbacks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One event from the session to its consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Assistant text fragment, streamed as generated
    Text(String),
    /// Channel opened (`true`) or closed (`false`)
    Connection(bool),
    /// The service finished streaming a tool invocation request
    ToolCall(ToolCall),
    /// A transcript entry was appended to the session log
    Transcript(TranscriptEntry),
}

/// A structured request to invoke an externally-implemented tool.
///
/// Ownership transfers to the orchestrator on delivery; the session keeps
/// no reference and never sends a result back to the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name from the session's catalog
    pub name: String,
    /// Service-assigned call identifier, when provided
    pub call_id: Option<String>,
    /// Parsed JSON arguments
    pub arguments: serde_json::Value,
}

/// One turn of recognized or generated text, in session order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who spoke
    pub role: TranscriptRole,
    /// The text of the turn
    pub text: String,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
}

/// Speaker of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    /// User speech transcript
    User,
    /// Assistant response transcript
    Assistant,
}

impl fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptRole::User => write!(f, "user"),
            TranscriptRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_role_display() {
        assert_eq!(TranscriptRole::User.to_string(), "user");
        assert_eq!(TranscriptRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_tool_call_serialization() {
        let call = ToolCall {
            name: "generate_image".to_string(),
            call_id: Some("call_1".to_string()),
            arguments: serde_json::json!({"prompt": "a lighthouse"}),
        };
        let json = serde_json::to_string(&call).unwrap();
        assert!(json.contains("generate_image"));
        assert!(json.contains("lighthouse"));
    }
}
