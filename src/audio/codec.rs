//! Sample format conversion and wire encoding.
//!
//! The device boundary uses 32-bit float samples in `[-1.0, 1.0]`; the wire
//! carries 16-bit signed little-endian PCM, base64 encoded inside JSON
//! events. Conversion is asymmetric: negative samples scale by `0x8000`,
//! non-negative by `0x7FFF`, so both `-1.0` and `1.0` map onto representable
//! PCM values and the round trip stays within one LSB.
//!
//! Encoding and decoding always process bounded chunks, never the whole
//! frame in one pass. Chunk sizes are chosen so per-chunk base64 output
//! concatenates into a single valid stream, and the scratch buffers are
//! allocated once and reused, which keeps the real-time capture callback
//! free of large transient allocations.

use base64::prelude::*;

/// Positive full-scale PCM value.
const PCM_POS_SCALE: f32 = 0x7FFF as f32;

/// Negative full-scale PCM magnitude.
const PCM_NEG_SCALE: f32 = 0x8000 as f32;

/// Samples converted per encode chunk. 3072 samples are 6144 PCM bytes, a
/// multiple of 3, so each chunk's base64 output is padding-free and chunks
/// concatenate into one valid base64 string.
pub const ENCODE_CHUNK_SAMPLES: usize = 3072;

/// Base64 characters consumed per decode chunk. A multiple of 4, so every
/// chunk is independently decodable; 8192 characters decode to 6144 bytes.
pub const DECODE_CHUNK_CHARS: usize = 8192;

// =============================================================================
// Sample conversion
// =============================================================================

/// Convert one float sample to PCM16, clamping to `[-1.0, 1.0]`.
#[inline]
pub fn sample_to_pcm16(x: f32) -> i16 {
    let x = x.clamp(-1.0, 1.0);
    if x < 0.0 {
        (x * PCM_NEG_SCALE).round() as i16
    } else {
        (x * PCM_POS_SCALE).round() as i16
    }
}

/// Convert one PCM16 sample back to float.
///
/// Algebraic inverse of [`sample_to_pcm16`]; `-32768` maps to exactly
/// `-1.0` and the round-trip error is at most `1.0 / 32768.0` per sample.
#[inline]
pub fn pcm16_to_sample(s: i16) -> f32 {
    if s < 0 {
        s as f32 / PCM_NEG_SCALE
    } else {
        s as f32 / PCM_POS_SCALE
    }
}

/// Exact length of the base64 text produced for `sample_count` samples.
pub fn encoded_len(sample_count: usize) -> usize {
    (sample_count * 2).div_ceil(3) * 4
}

// =============================================================================
// Chunked encode
// =============================================================================

/// Reusable PCM byte buffer for the encode path.
///
/// Sized for one encode chunk at construction and never grown afterward.
#[derive(Debug)]
pub struct EncodeScratch {
    pcm: Vec<u8>,
}

impl EncodeScratch {
    pub fn new() -> Self {
        Self {
            pcm: Vec::with_capacity(ENCODE_CHUNK_SAMPLES * 2),
        }
    }
}

impl Default for EncodeScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a float frame as base64 PCM16, appending to `out`.
///
/// Processes at most [`ENCODE_CHUNK_SAMPLES`] samples at a time through the
/// scratch buffer; memory use is bounded by the chunk size regardless of the
/// frame length.
pub fn encode_frame(samples: &[f32], scratch: &mut EncodeScratch, out: &mut String) {
    for chunk in samples.chunks(ENCODE_CHUNK_SAMPLES) {
        scratch.pcm.clear();
        for &s in chunk {
            scratch.pcm.extend_from_slice(&sample_to_pcm16(s).to_le_bytes());
        }
        BASE64_STANDARD.encode_string(&scratch.pcm, out);
    }
}

// =============================================================================
// Chunked decode
// =============================================================================

/// Reusable byte and sample buffers for the decode path.
///
/// Sized for one decode chunk at construction and never grown afterward.
#[derive(Debug)]
pub struct DecodeScratch {
    bytes: Vec<u8>,
    samples: Vec<f32>,
}

impl DecodeScratch {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(DECODE_CHUNK_CHARS / 4 * 3),
            samples: Vec::with_capacity(DECODE_CHUNK_CHARS / 4 * 3 / 2),
        }
    }
}

impl Default for DecodeScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a base64 PCM16 payload into float samples, handing each decoded
/// chunk to `sink` as it becomes available.
///
/// Returns the total number of samples delivered. A trailing odd byte in a
/// malformed payload is ignored. Memory use is bounded by
/// [`DECODE_CHUNK_CHARS`] regardless of the payload length.
pub fn decode_frame<F>(
    audio: &str,
    scratch: &mut DecodeScratch,
    mut sink: F,
) -> Result<usize, base64::DecodeError>
where
    F: FnMut(&[f32]),
{
    let mut total = 0;
    for chunk in audio.as_bytes().chunks(DECODE_CHUNK_CHARS) {
        scratch.bytes.clear();
        BASE64_STANDARD.decode_vec(chunk, &mut scratch.bytes)?;

        scratch.samples.clear();
        for pair in scratch.bytes.chunks_exact(2) {
            let s = i16::from_le_bytes([pair[0], pair[1]]);
            scratch.samples.push(pcm16_to_sample(s));
        }

        sink(&scratch.samples);
        total += scratch.samples.len();
    }
    Ok(total)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_error_bound() {
        for &x in &[-1.0f32, -0.5, 0.0, 0.5, 0.999969] {
            let back = pcm16_to_sample(sample_to_pcm16(x));
            assert!(
                (back - x).abs() <= 1.0 / 32768.0,
                "round trip of {} drifted to {}",
                x,
                back
            );
        }
    }

    #[test]
    fn test_boundary_exactness() {
        assert_eq!(pcm16_to_sample(-32768), -1.0);
        assert_eq!(sample_to_pcm16(0.0), 0);
        assert_eq!(sample_to_pcm16(-1.0), -32768);
        assert_eq!(sample_to_pcm16(1.0), 32767);
    }

    #[test]
    fn test_out_of_range_clamped() {
        assert_eq!(sample_to_pcm16(1.5), 32767);
        assert_eq!(sample_to_pcm16(-2.0), -32768);
    }

    #[test]
    fn test_chunked_encode_matches_single_shot() {
        // Longer than one chunk so the concatenation path is exercised.
        let samples: Vec<f32> = (0..ENCODE_CHUNK_SAMPLES * 2 + 777)
            .map(|i| ((i % 200) as f32 - 100.0) / 100.0)
            .collect();

        let mut scratch = EncodeScratch::new();
        let mut chunked = String::new();
        encode_frame(&samples, &mut scratch, &mut chunked);

        let mut pcm = Vec::new();
        for &s in &samples {
            pcm.extend_from_slice(&sample_to_pcm16(s).to_le_bytes());
        }
        let single = BASE64_STANDARD.encode(&pcm);

        assert_eq!(chunked, single);
        assert_eq!(chunked.len(), encoded_len(samples.len()));
    }

    #[test]
    fn test_decode_inverts_encode() {
        let samples: Vec<f32> = (0..DECODE_CHUNK_CHARS / 4 * 3)
            .map(|i| ((i % 97) as f32 - 48.0) / 48.0)
            .collect();

        let mut enc = EncodeScratch::new();
        let mut encoded = String::new();
        encode_frame(&samples, &mut enc, &mut encoded);

        let mut dec = DecodeScratch::new();
        let mut decoded = Vec::new();
        let n = decode_frame(&encoded, &mut dec, |chunk| decoded.extend_from_slice(chunk))
            .unwrap();

        assert_eq!(n, samples.len());
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() <= 1.0 / 32768.0);
        }
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let mut dec = DecodeScratch::new();
        let result = decode_frame("not valid base64!!", &mut dec, |_| {});
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_delivers_bounded_chunks() {
        let payload = vec![0u8; DECODE_CHUNK_CHARS / 4 * 3 * 3];
        let encoded = BASE64_STANDARD.encode(&payload);

        let mut dec = DecodeScratch::new();
        let mut deliveries = Vec::new();
        decode_frame(&encoded, &mut dec, |chunk| deliveries.push(chunk.len())).unwrap();

        assert_eq!(deliveries.len(), 3);
        for len in deliveries {
            assert!(len <= DECODE_CHUNK_CHARS / 4 * 3 / 2);
        }
    }
}
