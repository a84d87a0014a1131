//! Protocol session: the duplex channel, its configuration handshake, and
//! the routing of inbound events to the audio pipeline and the orchestrator.
//!
//! # Lifecycle
//!
//! `Disconnected → Connecting → Open → Closing → Disconnected`, with
//! `Error` reachable from `Connecting` or `Open` and always running the
//! same cleanup as `Closing`. [`VoiceSession::connect`] resolves or rejects
//! exactly once; [`VoiceSession::disconnect`] is legal from any state and
//! idempotent. There is no automatic reconnection: a dropped channel is
//! surfaced as `Connection(false)` and reconnecting is the caller's
//! responsibility.

pub mod bridge;
pub mod client;
pub mod config;
pub mod events;
pub mod messages;

pub use bridge::{ToolCallBridge, TranscriptRecorder};
pub use client::{SessionState, VoiceSession};
pub use config::{
    DEFAULT_REALTIME_MODEL, DEFAULT_REALTIME_URL, SessionOptions, ToolSpec, TurnDetectionMode,
    WIRE_SAMPLE_RATE,
};
pub use events::{SessionEvent, ToolCall, TranscriptEntry, TranscriptRole};
