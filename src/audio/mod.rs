//! Real-time audio pipeline: device callbacks, sample conversion, and the
//! lock-free buffering between them and the network.
//!
//! # Architecture
//!
//! Two hardware-clocked callback contexts exist, one per device direction:
//!
//! - the capture callback runs [`CaptureStage`], which converts each block
//!   to the wire format and hands it off without blocking;
//! - the output callback runs [`PlaybackScheduler::fill_block`], which pulls
//!   from an SPSC [`RingBuffer`] fed by the network context.
//!
//! Neither callback blocks, waits on the network, or allocates unboundedly.
//! [`AudioBackend`] is the seam that binds both callbacks to an actual
//! device layer; [`CpalBackend`] is the hardware implementation and
//! [`NullBackend`] the headless one.

pub mod backend;
pub mod capture;
pub mod codec;
pub mod device;
pub mod playback;
pub mod ring;

pub use backend::{AudioBackend, NullBackend};
pub use capture::CaptureStage;
pub use device::CpalBackend;
pub use playback::{PRE_BUFFER_SAMPLES, PlaybackScheduler};
pub use ring::RingBuffer;
