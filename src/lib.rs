//! Real-time bidirectional voice streaming client.
//!
//! `voicelink` connects a local microphone and speaker to a remote
//! conversational speech service over a persistent WebSocket channel:
//! captured audio streams up as PCM16 frames, synthesized speech streams
//! back down into a jitter-absorbing playback buffer, and text deltas,
//! transcripts and tool-call requests are surfaced to an external
//! orchestrator as typed [`SessionEvent`]s.
//!
//! # Audio format
//!
//! Mono PCM 16-bit signed little-endian at 24 kHz on the wire; 32-bit float
//! in `[-1.0, 1.0]` at the device boundary.
//!
//! # Example
//!
//! ```rust,ignore
//! use voicelink::{SessionEvent, SessionOptions, VoiceSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = SessionOptions::from_env()?;
//!     let (mut session, mut events) = VoiceSession::new(options);
//!     session.connect().await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             SessionEvent::Text(fragment) => print!("{fragment}"),
//!             SessionEvent::Transcript(entry) => println!("[{}] {}", entry.role, entry.text),
//!             SessionEvent::ToolCall(call) => println!("tool requested: {}", call.name),
//!             SessionEvent::Connection(false) => break,
//!             SessionEvent::Connection(true) => {}
//!         }
//!     }
//!     session.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod error;
pub mod session;

// Re-export commonly used items for convenience
pub use audio::{AudioBackend, CpalBackend, NullBackend, PlaybackScheduler, RingBuffer};
pub use error::{VoiceError, VoiceResult};
pub use session::{
    SessionEvent, SessionOptions, SessionState, ToolCall, ToolSpec, TranscriptEntry,
    TranscriptRole, VoiceSession,
};
