//! Error types for the voicelink pipeline.

use thiserror::Error;

/// Errors that can occur while setting up or running a voice session.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// An audio device could not be opened or started
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Connection to the remote service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation not legal in the current session state
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for voice session operations.
pub type VoiceResult<T> = Result<T, VoiceError>;
