//! Backend seam between the session and the audio device layer.
//!
//! The session drives capture and playback through [`AudioBackend`] so the
//! device layer can be swapped out: the cpal implementation in
//! [`device`](super::device) for real hardware, [`NullBackend`] for headless
//! operation and tests where no device exists.

use std::sync::Arc;

use super::capture::CaptureStage;
use super::playback::PlaybackScheduler;
use crate::error::VoiceResult;

/// Starts and stops the capture/playback device pair.
///
/// `start` takes ownership of the capture stage (it lives inside the input
/// callback) and a shared handle to the playback scheduler (the output
/// callback pulls from it). `stop` is idempotent; a backend that was never
/// started treats it as a no-op.
pub trait AudioBackend: Send {
    fn start(
        &mut self,
        capture: CaptureStage,
        playback: Arc<PlaybackScheduler>,
    ) -> VoiceResult<()>;

    fn stop(&mut self);
}

/// Backend that opens no devices.
///
/// Capture never produces frames and nothing drains the playback ring; the
/// session's protocol behavior is otherwise unchanged, which is exactly what
/// integration tests and headless deployments need.
#[derive(Debug, Default)]
pub struct NullBackend {
    // Held so the capture stage (and its channel sender) lives as long as a
    // real backend would keep it.
    capture: Option<CaptureStage>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for NullBackend {
    fn start(
        &mut self,
        capture: CaptureStage,
        _playback: Arc<PlaybackScheduler>,
    ) -> VoiceResult<()> {
        self.capture = Some(capture);
        Ok(())
    }

    fn stop(&mut self) {
        self.capture = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::mpsc;

    #[test]
    fn test_null_backend_lifecycle() {
        let (tx, _rx) = mpsc::channel(4);
        let stage = CaptureStage::new(tx, Arc::new(AtomicBool::new(false)));
        let scheduler = Arc::new(PlaybackScheduler::with_params(1024, 100));

        let mut backend = NullBackend::new();
        backend.start(stage, scheduler).unwrap();
        backend.stop();
        backend.stop(); // idempotent
    }

    #[test]
    fn test_backend_is_object_safe() {
        fn assert_boxed(_: Box<dyn AudioBackend>) {}
        assert_boxed(Box::new(NullBackend::new()));
    }
}
