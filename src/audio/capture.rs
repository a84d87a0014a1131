//! Capture-side bridge from the input device to the protocol session.
//!
//! Each input-device callback hands over one fixed-size float block; the
//! stage converts it to the wire format and forwards it immediately. There
//! is no capture-side buffering and no backpressure toward the device: if
//! the channel is closed or the outbound queue is full, the frame is
//! dropped and counted, nothing more.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use super::codec::{self, EncodeScratch};
use crate::session::messages::ClientEvent;

/// Converts captured float blocks to wire frames and hands them to the
/// session's outbound queue.
///
/// Owned by the input-device callback; every method takes `&mut self` and
/// runs on the capture thread. `try_send` is the only contact with the rest
/// of the system, so the callback never blocks and never waits on the
/// network.
pub struct CaptureStage {
    outbound: mpsc::Sender<ClientEvent>,
    /// Set by the session while the channel is open. Frames produced while
    /// the gate is closed are dropped, not queued.
    link_open: Arc<AtomicBool>,
    scratch: EncodeScratch,
    frames_sent: u64,
    frames_dropped: u64,
}

impl CaptureStage {
    pub fn new(outbound: mpsc::Sender<ClientEvent>, link_open: Arc<AtomicBool>) -> Self {
        Self {
            outbound,
            link_open,
            scratch: EncodeScratch::new(),
            frames_sent: 0,
            frames_dropped: 0,
        }
    }

    /// Forward one captured block. Called once per input-device callback.
    pub fn on_input_block(&mut self, samples: &[f32]) {
        if !self.link_open.load(Ordering::Acquire) {
            self.frames_dropped += 1;
            return;
        }

        let mut audio = String::with_capacity(codec::encoded_len(samples.len()));
        codec::encode_frame(samples, &mut self.scratch, &mut audio);

        match self.outbound.try_send(ClientEvent::InputAudioBufferAppend { audio }) {
            Ok(()) => self.frames_sent += 1,
            Err(_) => {
                // Queue full or session gone; the frame is simply lost.
                self.frames_dropped += 1;
            }
        }
    }

    /// Frames handed to the outbound queue so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Frames dropped because the channel was closed or the queue was full.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }
}

impl std::fmt::Debug for CaptureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStage")
            .field("frames_sent", &self.frames_sent)
            .field("frames_dropped", &self.frames_dropped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::prelude::*;

    fn stage(capacity: usize, open: bool) -> (CaptureStage, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let gate = Arc::new(AtomicBool::new(open));
        (CaptureStage::new(tx, gate), rx)
    }

    #[test]
    fn test_forwards_encoded_frame_when_open() {
        let (mut stage, mut rx) = stage(4, true);
        let block = vec![0.5f32; 480];
        stage.on_input_block(&block);

        assert_eq!(stage.frames_sent(), 1);
        match rx.try_recv().unwrap() {
            ClientEvent::InputAudioBufferAppend { audio } => {
                let bytes = BASE64_STANDARD.decode(&audio).unwrap();
                assert_eq!(bytes.len(), block.len() * 2);
                let first = i16::from_le_bytes([bytes[0], bytes[1]]);
                assert_eq!(first, codec::sample_to_pcm16(0.5));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_drops_when_gate_closed() {
        let (mut stage, mut rx) = stage(4, false);
        stage.on_input_block(&[0.1; 128]);

        assert_eq!(stage.frames_sent(), 0);
        assert_eq!(stage.frames_dropped(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drops_when_queue_full() {
        let (mut stage, _rx) = stage(1, true);
        stage.on_input_block(&[0.1; 64]);
        stage.on_input_block(&[0.2; 64]);

        assert_eq!(stage.frames_sent(), 1);
        assert_eq!(stage.frames_dropped(), 1);
    }

    #[test]
    fn test_drops_when_receiver_gone() {
        let (mut stage, rx) = stage(4, true);
        drop(rx);
        stage.on_input_block(&[0.1; 64]);
        assert_eq!(stage.frames_dropped(), 1);
    }
}
