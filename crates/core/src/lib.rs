//! Core interview logic for the CareerFlow mock-interview engine.
//!
//! This crate is transport-independent: it owns the interview stage machine,
//! the dialogue engine that produces the interviewer's next utterance, and the
//! evaluator that scores a finished session. All external collaborators (the
//! language model, speech-to-text/text-to-speech, and the profile/gap-analysis
//! service) are consumed through narrow async traits so the web service can
//! swap in mocks for testing.

pub mod context;
pub mod dialogue;
pub mod evaluator;
pub mod llm_client;
pub mod speech;
pub mod stage;
