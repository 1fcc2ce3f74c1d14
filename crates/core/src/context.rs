//! Interview context resolution.
//!
//! The candidate profile, target job, and precomputed skill-gap report are
//! produced by an external profile/gap-analysis service. This module defines
//! the immutable [`InterviewContext`] consumed by the dialogue engine and
//! evaluator, and the [`ContextService`] collaborator that resolves it.

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The interview flavour requested by the client at handshake.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterviewKind {
    #[default]
    Technical,
    Behavioral,
}

impl fmt::Display for InterviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterviewKind::Technical => write!(f, "TECHNICAL"),
            InterviewKind::Behavioral => write!(f, "BEHAVIORAL"),
        }
    }
}

/// Summary of the candidate, as returned by the profile service.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CandidateProfile {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

/// The job posting the candidate is interviewing for.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct JobPosting {
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub description: String,
}

/// Precomputed gap analysis between the candidate's profile and the job.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GapReport {
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub weak_areas: Vec<String>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
    #[serde(default)]
    pub assessment: String,
}

/// Immutable per-session context, resolved once at session start and
/// read-only for the rest of the interview.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct InterviewContext {
    pub user: CandidateProfile,
    pub job: JobPosting,
    pub gaps: GapReport,
}

/// Resolves an [`InterviewContext`] for a candidate/job pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContextService: Send + Sync {
    async fn resolve_context(&self, user_id: &str, job_id: &str) -> Result<InterviewContext>;
}

/// HTTP implementation of [`ContextService`] against the profile/gap-analysis
/// collaborator.
pub struct HttpContextService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContextService {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ContextService for HttpContextService {
    async fn resolve_context(&self, user_id: &str, job_id: &str) -> Result<InterviewContext> {
        let url = format!("{}/interview-context/{user_id}/{job_id}", self.base_url);
        let context: InterviewContext = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // A context without a job title or candidate name cannot drive a
        // meaningful interview; reject it up front.
        if context.job.title.trim().is_empty() || context.user.name.trim().is_empty() {
            bail!("Missing required job or user information in interview context");
        }
        Ok(context)
    }
}
