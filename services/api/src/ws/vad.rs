//! Voice Activity Detection
//!
//! Segments a stream of fixed-size raw PCM16 audio frames into finalized
//! utterances by energy thresholding: frames louder than
//! [`SILENCE_THRESHOLD`] count as speech, and an utterance is finalized once
//! speech has been followed by [`SILENCE_DURATION`] of quiet.

use std::time::{Duration, Instant};

/// RMS (over i16 samples) above which a frame counts as speech.
pub const SILENCE_THRESHOLD: f64 = 500.0;

/// How long the candidate must stay quiet before their utterance is final.
pub const SILENCE_DURATION: Duration = Duration::from_millis(1500);

/// Calculates the Root Mean Square (volume) of a PCM16 little-endian chunk.
pub fn calculate_rms(audio_chunk: &[u8]) -> f64 {
    let mut sum_squares = 0.0f64;
    let mut count = 0usize;
    for sample in audio_chunk.chunks_exact(2) {
        let value = i16::from_le_bytes([sample[0], sample[1]]) as f64;
        sum_squares += value * value;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    (sum_squares / count as f64).sqrt()
}

/// Accumulates speech frames and emits one finalized utterance per detected
/// speech segment. The buffer is owned solely by this pipeline and cleared on
/// every emission.
///
/// Timestamps are injected by the caller so the segmentation logic stays
/// deterministic under test.
#[derive(Debug, Default)]
pub struct VadSegmenter {
    buffer: Vec<u8>,
    is_speaking: bool,
    silence_start: Option<Instant>,
}

impl VadSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one frame into the segmenter. Returns the accumulated utterance
    /// once a full speech segment has been observed, `None` otherwise.
    ///
    /// Only speech frames are accumulated; leading and trailing silence never
    /// appears in the emitted segment.
    pub fn push_frame(&mut self, frame: &[u8], now: Instant) -> Option<Vec<u8>> {
        let rms = calculate_rms(frame);

        if rms > SILENCE_THRESHOLD {
            self.is_speaking = true;
            self.silence_start = None;
            self.buffer.extend_from_slice(frame);
            return None;
        }

        if !self.is_speaking {
            return None;
        }

        let started = *self.silence_start.get_or_insert(now);
        if now.duration_since(started) >= SILENCE_DURATION {
            self.is_speaking = false;
            self.silence_start = None;
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }
}
