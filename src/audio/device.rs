//! Audio device backend built on `cpal`.
//!
//! Opens the default input and output devices at the wire format (mono,
//! 24 kHz, f32) and runs both streams from a dedicated audio thread.
//! `cpal::Stream` is not `Send`, so the streams are built and owned by that
//! thread; the handle only carries a shutdown channel and the join handle.
//!
//! The capture callback owns its [`CaptureStage`]; the output callback holds
//! a shared [`PlaybackScheduler`]. Both callbacks do fixed work per block
//! and never touch the network.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::backend::AudioBackend;
use super::capture::CaptureStage;
use super::playback::PlaybackScheduler;
use crate::error::{VoiceError, VoiceResult};
use crate::session::config::WIRE_SAMPLE_RATE;

/// Device backend using the system default input and output devices.
#[derive(Debug, Default)]
pub struct CpalBackend {
    running: Option<DeviceThread>,
}

#[derive(Debug)]
struct DeviceThread {
    stop_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream_config() -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(WIRE_SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        }
    }
}

impl AudioBackend for CpalBackend {
    /// Open both devices and start streaming.
    ///
    /// Device setup happens on the audio thread; this call waits for its
    /// result so a missing device or rejected configuration fails here,
    /// before any network connection exists.
    fn start(
        &mut self,
        capture: CaptureStage,
        playback: Arc<PlaybackScheduler>,
    ) -> VoiceResult<()> {
        if self.running.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::channel::<VoiceResult<()>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let join = std::thread::Builder::new()
            .name("voicelink-audio".to_string())
            .spawn(move || run_device_thread(capture, playback, ready_tx, stop_rx))
            .map_err(|e| VoiceError::AudioDevice(format!("failed to spawn audio thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.running = Some(DeviceThread { stop_tx, join });
                tracing::info!("audio devices started (mono, {} Hz, f32)", WIRE_SAMPLE_RATE);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(VoiceError::AudioDevice(
                    "audio thread exited before reporting readiness".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.stop_tx.send(());
            if running.join.join().is_err() {
                tracing::warn!("audio thread panicked during shutdown");
            } else {
                tracing::info!("audio devices stopped");
            }
        }
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the dedicated audio thread: build both streams, report readiness,
/// park until told to stop. The streams are dropped (and the hardware
/// released) when this function returns.
fn run_device_thread(
    mut capture: CaptureStage,
    playback: Arc<PlaybackScheduler>,
    ready_tx: mpsc::Sender<VoiceResult<()>>,
    stop_rx: mpsc::Receiver<()>,
) {
    let streams = (|| -> VoiceResult<(cpal::Stream, cpal::Stream)> {
        let host = cpal::default_host();
        let config = CpalBackend::stream_config();

        let input_device = host
            .default_input_device()
            .ok_or_else(|| VoiceError::AudioDevice("no default input device".to_string()))?;
        let output_device = host
            .default_output_device()
            .ok_or_else(|| VoiceError::AudioDevice("no default output device".to_string()))?;

        let input_stream = input_device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    capture.on_input_block(data);
                },
                |err: cpal::StreamError| {
                    tracing::error!("capture stream error: {err}");
                },
                None,
            )
            .map_err(|e| VoiceError::AudioDevice(format!("failed to build input stream: {e}")))?;

        let output_stream = output_device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    playback.fill_block(data);
                },
                |err: cpal::StreamError| {
                    tracing::error!("playback stream error: {err}");
                },
                None,
            )
            .map_err(|e| VoiceError::AudioDevice(format!("failed to build output stream: {e}")))?;

        input_stream
            .play()
            .map_err(|e| VoiceError::AudioDevice(format!("failed to start capture: {e}")))?;
        output_stream
            .play()
            .map_err(|e| VoiceError::AudioDevice(format!("failed to start playback: {e}")))?;

        Ok((input_stream, output_stream))
    })();

    match streams {
        Ok(streams) => {
            let _ = ready_tx.send(Ok(()));
            // Block until stop is requested or the handle is dropped.
            let _ = stop_rx.recv();
            drop(streams);
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_handle_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CpalBackend>();
    }

    #[test]
    fn test_stream_config_matches_wire_format() {
        let config = CpalBackend::stream_config();
        assert_eq!(config.channels, 1);
        assert_eq!(config.sample_rate, cpal::SampleRate(24_000));
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut backend = CpalBackend::new();
        backend.stop();
        backend.stop();
    }
}
