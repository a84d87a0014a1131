//! Lock-free single-producer/single-consumer sample ring buffer.
//!
//! The ring is the only synchronization point between the network context
//! (producer, decoded inbound audio) and the output-device callback
//! (consumer). Both cursors are atomics with acquire/release ordering; the
//! hot path takes no locks and performs no allocation.
//!
//! One slot is permanently reserved so a full ring and an empty ring are
//! distinguishable: `available_read() + available_write() == capacity() - 1`
//! holds after every operation.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity circular sample store.
///
/// # Concurrency contract
///
/// Safe for exactly one producer thread calling [`push`](Self::push) and one
/// consumer thread calling [`pull`](Self::pull). [`clear`](Self::clear) may
/// only be called while the consumer is halted. Violating this contract is
/// not memory-unsafe for the cursors but can tear individual samples; the
/// session upholds it by construction.
pub struct RingBuffer {
    buf: Box<[UnsafeCell<f32>]>,
    /// Write cursor, stored mod capacity. Owned by the producer.
    write: AtomicUsize,
    /// Read cursor, stored mod capacity. Owned by the consumer.
    read: AtomicUsize,
}

// The UnsafeCell storage is coordinated through the cursors: the producer
// only writes slots the consumer cannot yet see (published by the release
// store on `write`), and the consumer only reads slots the producer has
// published. SPSC discipline is the caller's obligation, documented above.
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Create a ring with room for `capacity - 1` readable samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`; a ring that cannot hold a single sample is
    /// a configuration bug, not a runtime condition.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring capacity must be at least 2");
        let buf = (0..capacity).map(|_| UnsafeCell::new(0.0)).collect();
        Self {
            buf,
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    /// Total allocated slots, one of which is permanently reserved.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn used(&self, w: usize, r: usize) -> usize {
        (w + self.buf.len() - r) % self.buf.len()
    }

    /// Samples currently readable.
    #[inline]
    pub fn available_read(&self) -> usize {
        let w = self.write.load(Ordering::Acquire);
        let r = self.read.load(Ordering::Acquire);
        self.used(w, r)
    }

    /// Samples currently writable without overwriting unread data.
    #[inline]
    pub fn available_write(&self) -> usize {
        self.capacity() - self.available_read() - 1
    }

    /// Append samples, never blocking and never overwriting unread data.
    ///
    /// Accepts at most [`available_write`](Self::available_write) samples;
    /// the return value is the number actually written, and any excess is
    /// dropped by the caller's accounting, not by an error.
    pub fn push(&self, samples: &[f32]) -> usize {
        let cap = self.buf.len();
        let w = self.write.load(Ordering::Relaxed);
        let r = self.read.load(Ordering::Acquire);
        let free = cap - self.used(w, r) - 1;
        let n = samples.len().min(free);

        for (i, &s) in samples[..n].iter().enumerate() {
            // Slots [w, w + n) are invisible to the consumer until the
            // release store below publishes them.
            unsafe { *self.buf[(w + i) % cap].get() = s };
        }

        self.write.store((w + n) % cap, Ordering::Release);
        n
    }

    /// Fill `out` from the ring, zero-padding any shortfall.
    ///
    /// The whole block is always populated; the return value is the number
    /// of real samples, letting the caller distinguish underrun silence from
    /// audio that happens to be silent.
    pub fn pull(&self, out: &mut [f32]) -> usize {
        let cap = self.buf.len();
        let r = self.read.load(Ordering::Relaxed);
        let w = self.write.load(Ordering::Acquire);
        let n = out.len().min(self.used(w, r));

        for (i, slot) in out[..n].iter_mut().enumerate() {
            // Slots [r, r + n) were published by the producer and cannot be
            // rewritten until the release store below frees them.
            *slot = unsafe { *self.buf[(r + i) % cap].get() };
        }
        out[n..].fill(0.0);

        self.read.store((r + n) % cap, Ordering::Release);
        n
    }

    /// Reset both cursors to zero in one operation.
    ///
    /// Legal only while the consumer is halted; the session calls this from
    /// teardown after the output stream has stopped.
    pub fn clear(&self) {
        self.read.store(0, Ordering::SeqCst);
        self.write.store(0, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("available_read", &self.available_read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32).collect()
    }

    #[test]
    fn test_conservation_invariant() {
        let ring = RingBuffer::with_capacity(16);
        let mut out = vec![0.0; 5];

        let check = |ring: &RingBuffer| {
            assert_eq!(
                ring.available_read() + ring.available_write(),
                ring.capacity() - 1
            );
        };

        check(&ring);
        for step in 0..40 {
            ring.push(&filled(3 + step % 7));
            check(&ring);
            ring.pull(&mut out);
            check(&ring);
        }
        ring.clear();
        check(&ring);
    }

    #[test]
    fn test_push_then_pull_preserves_order() {
        let ring = RingBuffer::with_capacity(64);
        assert_eq!(ring.push(&filled(10)), 10);

        let mut out = vec![-1.0; 10];
        assert_eq!(ring.pull(&mut out), 10);
        assert_eq!(out, filled(10));
    }

    #[test]
    fn test_overflow_accepts_exactly_available_write() {
        let ring = RingBuffer::with_capacity(8);
        assert_eq!(ring.available_write(), 7);

        // Larger than the remaining room: exactly the free space is taken.
        let written = ring.push(&filled(20));
        assert_eq!(written, 7);
        assert_eq!(ring.available_write(), 0);

        // Prior content survives in order, nothing was overwritten.
        let mut out = vec![0.0; 7];
        assert_eq!(ring.pull(&mut out), 7);
        assert_eq!(out, filled(7));
    }

    #[test]
    fn test_overflow_preserves_existing_content() {
        let ring = RingBuffer::with_capacity(8);
        ring.push(&[1.0, 2.0, 3.0]);

        let written = ring.push(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        assert_eq!(written, 4);

        let mut out = vec![0.0; 7];
        assert_eq!(ring.pull(&mut out), 7);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_pull_zero_fills_shortfall() {
        let ring = RingBuffer::with_capacity(16);
        ring.push(&[5.0, 6.0]);

        let mut out = vec![9.0; 6];
        let got = ring.pull(&mut out);
        assert_eq!(got, 2);
        assert_eq!(out, vec![5.0, 6.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_wraparound() {
        let ring = RingBuffer::with_capacity(8);
        let mut out = vec![0.0; 5];

        // Walk the cursors around the ring several times.
        for round in 0..20 {
            let base = round as f32 * 100.0;
            let block: Vec<f32> = (0..5).map(|i| base + i as f32).collect();
            assert_eq!(ring.push(&block), 5);
            assert_eq!(ring.pull(&mut out), 5);
            assert_eq!(out, block);
        }
    }

    #[test]
    fn test_clear_resets_cursors() {
        let ring = RingBuffer::with_capacity(8);
        ring.push(&filled(5));
        ring.clear();
        assert_eq!(ring.available_read(), 0);
        assert_eq!(ring.available_write(), 7);

        ring.push(&[42.0]);
        let mut out = vec![0.0; 1];
        assert_eq!(ring.pull(&mut out), 1);
        assert_eq!(out[0], 42.0);
    }

    #[test]
    fn test_spsc_threads() {
        use std::sync::Arc;

        let ring = Arc::new(RingBuffer::with_capacity(1024));
        let total: usize = 100_000;

        let producer = {
            let ring = ring.clone();
            std::thread::spawn(move || {
                let mut sent = 0usize;
                while sent < total {
                    let block: Vec<f32> =
                        (sent..(sent + 64).min(total)).map(|i| i as f32).collect();
                    let n = ring.push(&block);
                    sent += n;
                    if n == 0 {
                        std::thread::yield_now();
                    }
                }
            })
        };

        let mut expected = 0usize;
        let mut out = vec![0.0; 64];
        while expected < total {
            let got = ring.pull(&mut out);
            for &v in &out[..got] {
                assert_eq!(v, expected as f32);
                expected += 1;
            }
            if got == 0 {
                std::thread::yield_now();
            }
        }

        producer.join().unwrap();
    }
}
