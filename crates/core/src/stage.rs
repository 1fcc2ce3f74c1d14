//! Interview Stage Controller
//!
//! A deterministic finite-state machine over the interview phases. The
//! controller owns turn counting and phase-advance decisions; it is the only
//! component allowed to move a session forward, which keeps the progression
//! invariants (monotonic stages, bounded turns, irreversible ending) trivially
//! true under the single-task-per-session execution model.

use crate::evaluator::Feedback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hard cap on utterances emitted in one session, regardless of stage logic.
/// Acts as a liveness guarantee against runaway sessions.
pub const MAX_TURNS: u32 = 15;

/// The fixed interview phases, in order. Sessions only ever move forward
/// through this sequence; the derived `Ord` encodes the progression order.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intro,
    Resume,
    GapChallenge,
    Conclusion,
    End,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Intro => "intro",
            Stage::Resume => "resume",
            Stage::GapChallenge => "gap_challenge",
            Stage::Conclusion => "conclusion",
            Stage::End => "end",
        };
        write!(f, "{name}")
    }
}

/// Who said a given transcript line. Serialized with the wire/persistence
/// role names ("assistant" / "user") so the same entry type serves the
/// transport protocol and the stored transcript.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    #[serde(rename = "assistant")]
    Interviewer,
    #[serde(rename = "user")]
    Candidate,
}

/// One ordered line of the session transcript.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptEntry {
    pub fn interviewer(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Interviewer,
            text: text.into(),
        }
    }

    pub fn candidate(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Candidate,
            text: text.into(),
        }
    }
}

/// The mutable record of a single interview session, owned exclusively by the
/// session's transport task and mutated only through the methods here and the
/// [`StageController`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionState {
    pub stage: Stage,
    /// Utterances emitted across the whole session. Never decreases.
    pub turn: u32,
    /// Utterances emitted within the current stage; resets on stage change.
    pub stage_turn: u32,
    /// Append-only (speaker, text) history.
    pub transcript: Vec<TranscriptEntry>,
    /// Set true exactly once; irreversible.
    pub ending: bool,
    /// Populated only after the evaluator runs.
    pub feedback: Option<Feedback>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Intro,
            turn: 0,
            stage_turn: 0,
            transcript: Vec::new(),
            ending: false,
            feedback: None,
        }
    }

    /// Appends an interviewer utterance and advances both turn counters.
    /// A no-op once the session is ending: no further utterances may be added.
    pub fn record_question(&mut self, text: impl Into<String>) {
        if self.ending {
            return;
        }
        self.transcript.push(TranscriptEntry::interviewer(text));
        self.turn += 1;
        self.stage_turn += 1;
    }

    /// Appends a candidate answer. Answers do not count as turns.
    pub fn record_answer(&mut self, text: impl Into<String>) {
        if self.ending {
            return;
        }
        self.transcript.push(TranscriptEntry::candidate(text));
    }

    /// The last `n` transcript entries, for bounded LLM context windows.
    pub fn recent_transcript(&self, n: usize) -> &[TranscriptEntry] {
        let start = self.transcript.len().saturating_sub(n);
        &self.transcript[start..]
    }

    /// Stores the evaluation result. Write-once: later calls are ignored.
    pub fn set_feedback(&mut self, feedback: Feedback) {
        if self.feedback.is_none() {
            self.feedback = Some(feedback);
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// What the session loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDecision {
    /// Generate one more interviewer utterance while in the given stage.
    Ask(Stage),
    /// The interview is over; emit no further utterance and run evaluation.
    Finish,
}

/// Turns required in each stage before advancing to the next.
#[derive(Debug, Clone, Copy)]
struct StageQuota {
    turns: u32,
    next: Stage,
}

/// Decides, per utterance-emission request, whether the session stays in its
/// stage, advances, or terminates. Re-entrant and idempotent: evaluating a
/// session that already ended returns [`StageDecision::Finish`] without
/// touching the state further.
#[derive(Debug, Clone, Default)]
pub struct StageController;

impl StageController {
    pub fn new() -> Self {
        Self
    }

    fn quota(stage: Stage) -> StageQuota {
        match stage {
            Stage::Intro => StageQuota {
                turns: 2,
                next: Stage::Resume,
            },
            Stage::Resume => StageQuota {
                turns: 3,
                next: Stage::GapChallenge,
            },
            Stage::GapChallenge => StageQuota {
                turns: 4,
                next: Stage::Conclusion,
            },
            Stage::Conclusion => StageQuota {
                turns: 2,
                next: Stage::End,
            },
            Stage::End => StageQuota {
                turns: 0,
                next: Stage::End,
            },
        }
    }

    /// Evaluates the stage machine for the next turn, mutating `state` in
    /// place. Must be called exactly once before each utterance generation.
    pub fn next_action(&self, state: &mut SessionState) -> StageDecision {
        // Terminal states and the runaway guard come first so the controller
        // is a strict no-op once the session has ended.
        if state.ending || state.stage == Stage::End || state.turn >= MAX_TURNS {
            state.stage = Stage::End;
            state.ending = true;
            return StageDecision::Finish;
        }

        // The conclusion stage asks a single closing question. Once the
        // candidate has answered it, end immediately rather than generating
        // a second closing message.
        if state.stage == Stage::Conclusion && state.stage_turn >= 1 {
            state.stage = Stage::End;
            state.ending = true;
            return StageDecision::Finish;
        }

        let quota = Self::quota(state.stage);
        if state.stage_turn >= quota.turns {
            // Forward-only guard: the quota table is fixed, but this makes a
            // backward transition structurally impossible.
            if quota.next > state.stage {
                if quota.next == Stage::End {
                    state.stage = Stage::End;
                    state.ending = true;
                    return StageDecision::Finish;
                }
                state.stage = quota.next;
                state.stage_turn = 0;
            }
        }

        StageDecision::Ask(state.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_index(stage: Stage) -> usize {
        [
            Stage::Intro,
            Stage::Resume,
            Stage::GapChallenge,
            Stage::Conclusion,
            Stage::End,
        ]
        .iter()
        .position(|s| *s == stage)
        .unwrap()
    }

    /// Drives a full session: every `Ask` gets a question recorded and an
    /// answer appended, until the controller finishes.
    fn drive_to_completion(state: &mut SessionState) -> u32 {
        let controller = StageController::new();
        let mut evaluations = 0;
        loop {
            evaluations += 1;
            match controller.next_action(state) {
                StageDecision::Ask(stage) => {
                    state.record_question(format!("question in {stage}"));
                    state.record_answer("an answer");
                }
                StageDecision::Finish => return evaluations,
            }
            assert!(evaluations <= 100, "controller failed to terminate");
        }
    }

    #[test]
    fn stages_serialize_with_snake_case_names() {
        assert_eq!(
            serde_json::to_string(&Stage::GapChallenge).unwrap(),
            "\"gap_challenge\""
        );
        assert_eq!(serde_json::to_string(&Stage::Intro).unwrap(), "\"intro\"");
        let parsed: Stage = serde_json::from_str("\"conclusion\"").unwrap();
        assert_eq!(parsed, Stage::Conclusion);
    }

    #[test]
    fn stage_never_moves_backward() {
        let controller = StageController::new();
        let mut state = SessionState::new();
        let mut previous = stage_index(state.stage);
        loop {
            let decision = controller.next_action(&mut state);
            let current = stage_index(state.stage);
            assert!(current >= previous, "stage regressed");
            previous = current;
            match decision {
                StageDecision::Ask(_) => {
                    state.record_question("q");
                    state.record_answer("a");
                }
                StageDecision::Finish => break,
            }
        }
    }

    #[test]
    fn happy_path_ends_on_eleventh_evaluation() {
        // 2 intro + 3 resume + 4 gap_challenge + 1 conclusion question, then
        // the candidate's closing answer triggers the short-circuit.
        let mut state = SessionState::new();
        let evaluations = drive_to_completion(&mut state);
        assert_eq!(evaluations, 11);
        assert_eq!(state.turn, 10);
        assert_eq!(state.stage, Stage::End);
        assert!(state.ending);
    }

    #[test]
    fn stage_turn_resets_only_on_stage_change() {
        let controller = StageController::new();
        let mut state = SessionState::new();
        let mut stage = state.stage;
        loop {
            match controller.next_action(&mut state) {
                StageDecision::Ask(next_stage) => {
                    if next_stage != stage {
                        assert_eq!(state.stage_turn, 0, "reset expected on change");
                        stage = next_stage;
                    }
                    state.record_question("q");
                    state.record_answer("a");
                }
                StageDecision::Finish => break,
            }
        }
    }

    #[test]
    fn conclusion_short_circuits_after_one_answer() {
        let controller = StageController::new();
        let mut state = SessionState::new();
        state.stage = Stage::Conclusion;
        state.stage_turn = 0;
        state.turn = 9;

        // The closing question is still generated.
        assert_eq!(
            controller.next_action(&mut state),
            StageDecision::Ask(Stage::Conclusion)
        );
        state.record_question("closing question");
        state.record_answer("closing answer");

        // The very next evaluation terminates without an utterance.
        let transcript_len = state.transcript.len();
        assert_eq!(controller.next_action(&mut state), StageDecision::Finish);
        assert_eq!(state.stage, Stage::End);
        assert!(state.ending);
        assert_eq!(state.transcript.len(), transcript_len);
    }

    #[test]
    fn runaway_sessions_stop_at_the_turn_cap() {
        let controller = StageController::new();
        let mut state = SessionState::new();
        // Pathological driver: never lets a candidate answer land, but keeps
        // requesting utterances. Pin the stage machine in place by resetting
        // stage_turn so quota-based advancement never fires.
        loop {
            match controller.next_action(&mut state) {
                StageDecision::Ask(_) => {
                    state.record_question("q");
                    state.stage_turn = 0;
                }
                StageDecision::Finish => break,
            }
        }
        assert_eq!(state.turn, MAX_TURNS);
        assert_eq!(state.stage, Stage::End);
    }

    #[test]
    fn controller_is_idempotent_after_ending() {
        let controller = StageController::new();
        let mut state = SessionState::new();
        drive_to_completion(&mut state);
        let snapshot = (state.stage, state.turn, state.stage_turn, state.transcript.len());
        for _ in 0..3 {
            assert_eq!(controller.next_action(&mut state), StageDecision::Finish);
        }
        assert_eq!(
            snapshot,
            (state.stage, state.turn, state.stage_turn, state.transcript.len())
        );
    }

    #[test]
    fn no_utterances_append_after_ending() {
        let mut state = SessionState::new();
        drive_to_completion(&mut state);
        let len = state.transcript.len();
        state.record_question("too late");
        state.record_answer("too late");
        assert_eq!(state.transcript.len(), len);
    }

    #[test]
    fn feedback_is_write_once() {
        let mut state = SessionState::new();
        state.set_feedback(Feedback {
            score: 80,
            verdict: "Hired".into(),
            summary: "Strong".into(),
            strengths: vec![],
            improvements: vec![],
        });
        state.set_feedback(Feedback::fallback("second write"));
        assert_eq!(state.feedback.as_ref().unwrap().score, 80);
    }

    #[test]
    fn recent_transcript_is_bounded() {
        let mut state = SessionState::new();
        for i in 0..10 {
            state.record_answer(format!("answer {i}"));
        }
        let recent = state.recent_transcript(4);
        assert_eq!(recent.len(), 4);
        assert_eq!(recent[0].text, "answer 6");
        assert_eq!(state.recent_transcript(100).len(), 10);
    }
}
