//! Data shaping between inbound protocol messages and orchestrator events.
//!
//! [`ToolCallBridge`] validates tool invocation requests and
//! [`TranscriptRecorder`] keeps the session's append-only transcript log.
//! Both are driven only by the session's inbound routing.

use chrono::Utc;
use parking_lot::RwLock;

use super::events::{ToolCall, TranscriptEntry, TranscriptRole};

/// Turns completed function-call messages into typed [`ToolCall`]s.
///
/// The raw argument payload arrives as a JSON string; a payload that fails
/// to parse drops that call (logged) without disturbing any later message.
/// No result is ever sent back to the service; invocation is one-way by
/// design of the surrounding system, and result submission remains an open
/// question there.
#[derive(Debug, Default)]
pub struct ToolCallBridge;

impl ToolCallBridge {
    pub fn new() -> Self {
        Self
    }

    /// Validate one completed tool invocation.
    ///
    /// Returns `None` (after logging) when `raw_arguments` is not valid
    /// JSON.
    pub fn shape(
        &self,
        name: String,
        call_id: Option<String>,
        raw_arguments: &str,
    ) -> Option<ToolCall> {
        match serde_json::from_str::<serde_json::Value>(raw_arguments) {
            Ok(arguments) => Some(ToolCall {
                name,
                call_id,
                arguments,
            }),
            Err(e) => {
                tracing::error!(
                    tool = %name,
                    "discarding tool call with unparseable arguments: {e}"
                );
                None
            }
        }
    }
}

/// Append-only transcript log scoped to one session.
///
/// Entries accumulate for the lifetime of the session and are cleared
/// explicitly or when a new session starts.
#[derive(Debug, Default)]
pub struct TranscriptRecorder {
    entries: RwLock<Vec<TranscriptEntry>>,
}

impl TranscriptRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one turn and return the recorded entry.
    pub fn append(&self, role: TranscriptRole, text: String) -> TranscriptEntry {
        let entry = TranscriptEntry {
            role,
            text,
            timestamp: Utc::now(),
        };
        self.entries.write().push(entry.clone());
        entry
    }

    /// Snapshot of the transcript so far, in session order.
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries.read().clone()
    }

    /// Number of recorded turns.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Reset the log.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
