//! Playback scheduling between the network and the output device.
//!
//! Inbound audio arrives in bursts on the network context; the output device
//! demands fixed-size blocks on its own clock. The scheduler decouples the
//! two with a [`RingBuffer`] and a pre-buffer gate that holds playback back
//! until roughly 100 ms of audio has accumulated, so the first words of a
//! response do not stutter while the network warms up.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::ring::RingBuffer;

/// Ring capacity in seconds of audio.
const RING_SECONDS: u32 = 10;

/// Pre-buffer threshold: samples that must accumulate before playback
/// starts. 2400 samples is 100 ms at 24 kHz.
pub const PRE_BUFFER_SAMPLES: usize = 2400;

/// Pulls fixed-size blocks for the output device and accounts for underrun
/// and overflow.
///
/// Shared between the network context, which calls
/// [`enqueue`](Self::enqueue), and the output-device callback, which calls
/// [`fill_block`](Self::fill_block). All mutable state is atomic; the ring
/// itself is SPSC and the scheduler inherits that contract: one enqueueing
/// thread, one filling thread.
///
/// The pre-buffer gate arms once per [`stop`](Self::stop). A sustained
/// underrun that drains the ring mid-stream plays silence through the
/// zero-padded pull but does not re-enter the gated state; re-buffering
/// would trade a glitch for added latency, and the observed behavior of the
/// pipeline keeps the glitch.
pub struct PlaybackScheduler {
    ring: RingBuffer,
    buffering: AtomicBool,
    pre_buffer: usize,
    underruns: AtomicU64,
    samples_received: AtomicU64,
    overflow_dropped: AtomicU64,
}

impl PlaybackScheduler {
    /// Scheduler for the given sample rate with ~10 s of ring capacity.
    pub fn new(sample_rate: u32) -> Self {
        Self::with_params((sample_rate * RING_SECONDS) as usize, PRE_BUFFER_SAMPLES)
    }

    /// Scheduler with explicit ring capacity and pre-buffer threshold.
    pub fn with_params(capacity: usize, pre_buffer: usize) -> Self {
        Self {
            ring: RingBuffer::with_capacity(capacity),
            buffering: AtomicBool::new(true),
            pre_buffer,
            underruns: AtomicU64::new(0),
            samples_received: AtomicU64::new(0),
            overflow_dropped: AtomicU64::new(0),
        }
    }

    /// Accept a decoded inbound audio chunk. Called from the network context.
    ///
    /// Returns the number of samples actually buffered. Overflow drops the
    /// excess and counts it; it is never an error.
    pub fn enqueue(&self, samples: &[f32]) -> usize {
        let written = self.ring.push(samples);
        self.samples_received
            .fetch_add(samples.len() as u64, Ordering::Relaxed);

        let dropped = samples.len() - written;
        if dropped > 0 {
            self.overflow_dropped
                .fetch_add(dropped as u64, Ordering::Relaxed);
            tracing::trace!(dropped, "playback ring overflow, dropping newest samples");
        }
        written
    }

    /// Produce one output block. Called once per output-device callback.
    ///
    /// While buffering, the block is silence; the gate opens once the ring
    /// holds the pre-buffer threshold, and real audio starts on the next
    /// callback. After the gate opens, a short pull is zero-padded by the
    /// ring and counted as an underrun.
    pub fn fill_block(&self, out: &mut [f32]) {
        if self.buffering.load(Ordering::Acquire) {
            out.fill(0.0);
            if self.ring.available_read() >= self.pre_buffer {
                self.buffering.store(false, Ordering::Release);
            }
            return;
        }

        let got = self.ring.pull(out);
        if got < out.len() {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Halt playback state: re-arm the pre-buffer gate and drop buffered
    /// audio.
    ///
    /// The output stream must already be stopped; clearing the ring is only
    /// legal while the consumer is halted.
    pub fn stop(&self) {
        self.buffering.store(true, Ordering::Release);
        self.ring.clear();
        tracing::debug!(
            underruns = self.underruns.load(Ordering::Relaxed),
            overflow_dropped = self.overflow_dropped.load(Ordering::Relaxed),
            samples_received = self.samples_received.load(Ordering::Relaxed),
            "playback scheduler stopped"
        );
    }

    /// Whether the pre-buffer gate is still holding playback back.
    pub fn is_buffering(&self) -> bool {
        self.buffering.load(Ordering::Acquire)
    }

    /// Samples currently buffered and readable.
    pub fn buffered(&self) -> usize {
        self.ring.available_read()
    }

    /// Output callbacks that came up short since the last construction.
    pub fn underrun_count(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Samples dropped to overflow since construction.
    pub fn overflow_count(&self) -> u64 {
        self.overflow_dropped.load(Ordering::Relaxed)
    }

    /// Running total of samples handed to [`enqueue`](Self::enqueue),
    /// including any that overflowed.
    pub fn samples_received(&self) -> u64 {
        self.samples_received.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackScheduler")
            .field("buffering", &self.is_buffering())
            .field("buffered", &self.buffered())
            .field("underruns", &self.underrun_count())
            .finish()
    }
}
