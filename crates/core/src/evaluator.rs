//! Session Evaluator
//!
//! Scores a finished interview from the full transcript and context. The
//! evaluator is infallible by contract: if the language-model collaborator
//! errors or returns unparseable output, a zero-score fallback verdict is
//! produced so that every completed session ends with exactly one feedback
//! record.

use crate::context::InterviewContext;
use crate::llm_client::LlmClient;
use crate::stage::TranscriptEntry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// How many transcript entries are forwarded to the scoring prompt.
const EVALUATION_WINDOW: usize = 8;

/// The structured evaluation of one interview session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Feedback {
    /// 0-100.
    pub score: u8,
    pub verdict: String,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

impl Feedback {
    /// The zero-score record persisted when evaluation fails.
    pub fn fallback(reason: &str) -> Self {
        Self {
            score: 0,
            verdict: "Unable to evaluate".to_string(),
            summary: format!("The evaluation could not be completed: {reason}"),
            strengths: Vec::new(),
            improvements: Vec::new(),
        }
    }
}

/// Produces a [`Feedback`] record via the language-model collaborator.
pub struct Evaluator {
    llm: Arc<dyn LlmClient>,
}

impl Evaluator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Scores the session. Never returns an error; failures degrade to
    /// [`Feedback::fallback`].
    pub async fn evaluate(
        &self,
        ctx: &InterviewContext,
        transcript: &[TranscriptEntry],
    ) -> Feedback {
        let prompt = format!(
            "Evaluate this interview for {}. Return ONLY JSON:\n\
             {{\n    \"score\": <0-100>,\n    \"verdict\": \"Hired\" or \"Not Hired\",\n    \
             \"summary\": \"<brief 2-line evaluation>\",\n    \
             \"strengths\": [\"s1\", \"s2\"],\n    \"improvements\": [\"i1\", \"i2\"]\n}}",
            ctx.job.title
        );

        let start = transcript.len().saturating_sub(EVALUATION_WINDOW);
        let feedback = match self.llm.generate(&prompt, &transcript[start..]).await {
            Ok(raw) => match parse_feedback(&raw) {
                Ok(feedback) => feedback,
                Err(e) => {
                    warn!(error = ?e, "Evaluation output was unparseable, using fallback");
                    Feedback::fallback("the scoring response could not be parsed")
                }
            },
            Err(e) => {
                warn!(error = ?e, "Evaluation call failed, using fallback");
                Feedback::fallback("the scoring service was unavailable")
            }
        };

        info!(score = feedback.score, verdict = %feedback.verdict, "Evaluation complete");
        feedback
    }
}

/// Parses the scoring JSON, tolerating surrounding code fences.
fn parse_feedback(raw: &str) -> anyhow::Result<Feedback> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let mut feedback: Feedback = serde_json::from_str(cleaned.trim())?;
    feedback.score = feedback.score.min(100);
    Ok(feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{InterviewContext, JobPosting};
    use crate::llm_client::MockLlmClient;
    use anyhow::anyhow;

    fn test_context() -> InterviewContext {
        InterviewContext {
            job: JobPosting {
                title: "Backend Engineer".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let plain = r#"{"score": 72, "verdict": "Hired", "summary": "Solid.",
                        "strengths": ["clear"], "improvements": ["depth"]}"#;
        let feedback = parse_feedback(plain).unwrap();
        assert_eq!(feedback.score, 72);
        assert_eq!(feedback.verdict, "Hired");

        let fenced = format!("```json\n{plain}\n```");
        let feedback = parse_feedback(&fenced).unwrap();
        assert_eq!(feedback.score, 72);
        assert_eq!(feedback.strengths, vec!["clear".to_string()]);
    }

    #[test]
    fn scores_above_one_hundred_are_clamped() {
        let raw = r#"{"score": 250, "verdict": "Hired", "summary": "x"}"#;
        let feedback = parse_feedback(raw).unwrap();
        assert_eq!(feedback.score, 100);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let raw = r#"{"score": 10, "verdict": "Not Hired", "summary": "x"}"#;
        let feedback = parse_feedback(raw).unwrap();
        assert!(feedback.strengths.is_empty());
        assert!(feedback.improvements.is_empty());
    }

    #[tokio::test]
    async fn collaborator_failure_yields_fallback_record() {
        let mut llm = MockLlmClient::new();
        llm.expect_generate()
            .returning(|_, _| Err(anyhow!("timeout")));

        let evaluator = Evaluator::new(Arc::new(llm));
        let feedback = evaluator.evaluate(&test_context(), &[]).await;
        assert_eq!(feedback.score, 0);
        assert_eq!(feedback.verdict, "Unable to evaluate");
    }

    #[tokio::test]
    async fn unparseable_output_yields_fallback_record() {
        let mut llm = MockLlmClient::new();
        llm.expect_generate()
            .returning(|_, _| Ok("I think they did great!".to_string()));

        let evaluator = Evaluator::new(Arc::new(llm));
        let feedback = evaluator.evaluate(&test_context(), &[]).await;
        assert_eq!(feedback.score, 0);
        assert_eq!(feedback.verdict, "Unable to evaluate");
    }

    #[tokio::test]
    async fn well_formed_output_is_returned_as_is() {
        let mut llm = MockLlmClient::new();
        llm.expect_generate().returning(|_, _| {
            Ok(r#"{"score": 88, "verdict": "Hired", "summary": "Strong candidate.",
                   "strengths": ["depth"], "improvements": ["pacing"]}"#
                .to_string())
        });

        let evaluator = Evaluator::new(Arc::new(llm));
        let transcript = vec![TranscriptEntry::candidate("my answer")];
        let feedback = evaluator.evaluate(&test_context(), &transcript).await;
        assert_eq!(feedback.score, 88);
        assert_eq!(feedback.improvements, vec!["pacing".to_string()]);
    }
}
