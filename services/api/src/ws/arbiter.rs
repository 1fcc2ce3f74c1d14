//! Session Audio/Turn Arbiter
//!
//! A small state machine (idle/listening/thinking/speaking) that gates when
//! incoming audio may be interpreted as candidate speech. Two guards keep the
//! engine from transcribing its own synthesized voice: explicit state gating,
//! plus a time-based grace window after each synthesized response, because
//! frame delivery and state transitions are not perfectly synchronized across
//! the network boundary.

use serde::Serialize;
use std::time::{Duration, Instant};

/// Grace window after synthesized output during which frames are discarded
/// even in the listening state.
pub const COOLDOWN: Duration = Duration::from_secs(2);

/// Raw PCM16 at 16 kHz mono.
pub const PCM16_BYTES_PER_SECOND: f64 = 32_000.0;

/// The arbiter's lifecycle states, scoped to one voice session.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioState {
    Idle,
    Listening,
    Thinking,
    Speaking,
}

/// Gates the voice pipeline's view of incoming audio.
#[derive(Debug)]
pub struct TurnArbiter {
    state: AudioState,
    /// When the engine last finished speaking; anchors the cooldown window.
    last_response_at: Option<Instant>,
}

impl TurnArbiter {
    pub fn new() -> Self {
        Self {
            state: AudioState::Idle,
            last_response_at: None,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    /// The engine is generating its next utterance.
    pub fn begin_thinking(&mut self) {
        self.state = AudioState::Thinking;
    }

    /// Synthesized audio is being emitted to the peer.
    pub fn begin_speaking(&mut self) {
        self.state = AudioState::Speaking;
    }

    /// The engine is ready for candidate speech again. `now` anchors the
    /// cooldown window, so audio buffered by the peer during playback is
    /// still discarded for [`COOLDOWN`].
    pub fn begin_listening(&mut self, now: Instant) {
        self.state = AudioState::Listening;
        self.last_response_at = Some(now);
    }

    /// Whether an incoming frame may be treated as candidate speech.
    pub fn accepts_frame(&self, now: Instant) -> bool {
        if self.state != AudioState::Listening {
            return false;
        }
        match self.last_response_at {
            Some(at) => now.duration_since(at) >= COOLDOWN,
            None => true,
        }
    }

    /// How long to wait after dispatching synthesized audio before listening
    /// again: the audio's play time plus a margin, floored at [`COOLDOWN`].
    pub fn speech_wait(audio_len: usize) -> Duration {
        let play_time = audio_len as f64 / PCM16_BYTES_PER_SECOND;
        Duration::from_secs_f64((play_time + 0.5).max(COOLDOWN.as_secs_f64()))
    }
}

impl Default for TurnArbiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::vad::VadSegmenter;

    #[test]
    fn starts_idle_and_rejects_frames() {
        let arbiter = TurnArbiter::new();
        assert_eq!(arbiter.state(), AudioState::Idle);
        assert!(!arbiter.accepts_frame(Instant::now()));
    }

    #[test]
    fn rejects_frames_while_thinking_or_speaking() {
        let mut arbiter = TurnArbiter::new();
        arbiter.begin_thinking();
        assert!(!arbiter.accepts_frame(Instant::now()));
        arbiter.begin_speaking();
        assert!(!arbiter.accepts_frame(Instant::now()));
    }

    #[test]
    fn listening_frames_are_rejected_during_the_cooldown_window() {
        let mut arbiter = TurnArbiter::new();
        let t0 = Instant::now();
        arbiter.begin_listening(t0);

        assert!(!arbiter.accepts_frame(t0));
        assert!(!arbiter.accepts_frame(t0 + COOLDOWN / 2));
        assert!(arbiter.accepts_frame(t0 + COOLDOWN));
        assert!(arbiter.accepts_frame(t0 + COOLDOWN * 2));
    }

    #[test]
    fn speech_wait_is_floored_at_the_cooldown() {
        // 0.25 s of audio: the floor wins.
        assert_eq!(TurnArbiter::speech_wait(8_000), COOLDOWN);
        // 4 s of audio: play time plus the half-second margin wins.
        let wait = TurnArbiter::speech_wait(128_000);
        assert_eq!(wait, Duration::from_secs_f64(4.5));
    }

    #[test]
    fn audio_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AudioState::Listening).unwrap(),
            "\"listening\""
        );
        assert_eq!(
            serde_json::to_string(&AudioState::Thinking).unwrap(),
            "\"thinking\""
        );
    }

    /// Frames delivered while the arbiter is not accepting never reach the
    /// segmenter, so they can never appear in an emitted segment — even
    /// frames arriving just before a listening transition, inside the
    /// cooldown window.
    #[test]
    fn gated_frames_never_appear_in_a_segment() {
        let mut arbiter = TurnArbiter::new();
        let mut vad = VadSegmenter::new();
        let t0 = Instant::now();

        let loud_frame = |amplitude: i16| -> Vec<u8> {
            let mut f = Vec::new();
            for _ in 0..160 {
                f.extend_from_slice(&amplitude.to_le_bytes());
            }
            f
        };
        let echo = loud_frame(3000); // the engine's own voice, played back
        let speech = loud_frame(2000);
        let quiet = vec![0u8; 320];

        // Synthesized audio echoes back while speaking: dropped by the gate.
        arbiter.begin_speaking();
        assert!(!arbiter.accepts_frame(t0));

        // Transition to listening; echoes inside the cooldown are still dropped.
        arbiter.begin_listening(t0);
        let during_cooldown = t0 + COOLDOWN / 2;
        assert!(!arbiter.accepts_frame(during_cooldown));

        // Genuine speech after the cooldown flows through the gate. The echo
        // frames above were never pushed into the segmenter at all.
        let mut now = t0 + COOLDOWN;
        for frame in [&echo, &speech, &speech] {
            assert!(arbiter.accepts_frame(now));
            assert!(vad.push_frame(frame, now).is_none());
            now += Duration::from_millis(20);
        }

        assert!(vad.push_frame(&quiet, now).is_none());
        let segment = vad
            .push_frame(&quiet, now + crate::ws::vad::SILENCE_DURATION)
            .expect("speech should segment");

        // The segment holds exactly the three accepted loud frames; nothing
        // dropped during speaking or the cooldown is present.
        assert_eq!(segment.len(), echo.len() + speech.len() * 2);
    }
}
