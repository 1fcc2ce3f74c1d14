//! Dialogue Engine
//!
//! Turns (stage, context, transcript-so-far) into the interviewer's next
//! utterance by delegating to the language-model collaborator. Only the last
//! few transcript turns are forwarded for latency and cost control, and the
//! output is sanitized of role-label and markdown artifacts before it reaches
//! the wire or the speech synthesizer.

use crate::context::InterviewContext;
use crate::llm_client::LlmClient;
use crate::stage::{Stage, TranscriptEntry};
use std::sync::Arc;
use tracing::warn;

/// How many transcript entries are forwarded to the LLM per turn.
const RECENT_WINDOW: usize = 4;

/// Conclusion utterances longer than this are truncated to keep downstream
/// speech-synthesis latency bounded.
const MAX_CONCLUSION_CHARS: usize = 150;

/// Spoken when the generation collaborator fails; the interview must never
/// hard-stop on a transient generation failure.
pub const FALLBACK_UTTERANCE: &str = "Could you repeat that?";

/// Builds the stage-specific instruction handed to the LLM.
fn stage_instruction(stage: Stage, ctx: &InterviewContext) -> String {
    let base = format!(
        "You are interviewing for {}. Keep responses SHORT (1-2 sentences). \
         Ask ONE clear question. DO NOT include labels like 'Interviewer:' in your response.",
        ctx.job.title
    );

    match stage {
        Stage::Intro => format!("{base} Welcome and ask for a quick self-introduction."),
        Stage::Resume => {
            let skills = ctx
                .user
                .skills
                .iter()
                .take(2)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            let focus = if skills.is_empty() {
                "their experience".to_string()
            } else {
                skills
            };
            format!("{base} Ask about {focus} or a key project.")
        }
        Stage::GapChallenge => {
            let skill = ctx
                .gaps
                .missing_skills
                .first()
                .map(String::as_str)
                .unwrap_or("problem-solving");
            format!("{base} Ask about their experience or approach to {skill}.")
        }
        Stage::Conclusion => format!(
            "{base} CRITICAL: Max 15 words. Say: 'Thanks for your time today. \
             We'll review and be in touch soon. Goodbye!'"
        ),
        Stage::End => base,
    }
}

/// Strips role-label prefixes and markdown artifacts the collaborator may
/// emit, and bounds conclusion-stage output.
fn sanitize(stage: Stage, raw: &str) -> String {
    let mut text = raw
        .replace("Interviewer:", "")
        .replace("Interviewer :", "")
        .trim()
        .to_string();

    if stage == Stage::Conclusion && text.len() > MAX_CONCLUSION_CHARS {
        let cut = text
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= MAX_CONCLUSION_CHARS)
            .last()
            .unwrap_or(0);
        text.truncate(cut);
        text.push_str("...");
    }

    text.replace("**", "")
        .replace('*', "")
        .replace('_', "")
        .replace("~~", "")
}

/// Produces the interviewer's next utterance for the current stage.
pub struct DialogueEngine {
    llm: Arc<dyn LlmClient>,
}

impl DialogueEngine {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Generates the next interviewer utterance. Infallible by contract:
    /// collaborator failures degrade to [`FALLBACK_UTTERANCE`].
    pub async fn next_utterance(
        &self,
        stage: Stage,
        ctx: &InterviewContext,
        transcript: &[TranscriptEntry],
    ) -> String {
        let instruction = stage_instruction(stage, ctx);
        let start = transcript.len().saturating_sub(RECENT_WINDOW);
        match self.llm.generate(&instruction, &transcript[start..]).await {
            Ok(raw) => {
                let text = sanitize(stage, &raw);
                if text.is_empty() {
                    FALLBACK_UTTERANCE.to_string()
                } else {
                    text
                }
            }
            Err(e) => {
                warn!(%stage, error = ?e, "Generation failed, using fallback utterance");
                FALLBACK_UTTERANCE.to_string()
            }
        }
    }
}
