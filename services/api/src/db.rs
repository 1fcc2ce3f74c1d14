//! Data Access Layer
//!
//! This module contains all the functions for interacting with the PostgreSQL
//! database. Writes are idempotent upserts keyed by session id, so retries on
//! transient failure are safe without distributed locking.

use anyhow::Result;
use async_trait::async_trait;
use careerflow_core::{evaluator::Feedback, stage::TranscriptEntry};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Interview;

/// Persistence seam for interview records. The session loops and handlers go
/// through this trait so they can be exercised against an in-memory store.
#[async_trait]
pub trait InterviewStore: Send + Sync {
    /// Persists a completed session's transcript and feedback. Must be
    /// idempotent per session id: a retried write may not create a second
    /// record.
    async fn record_interview(
        &self,
        session_id: Uuid,
        user_id: &str,
        job_id: Option<&str>,
        transcript: &[TranscriptEntry],
        feedback: &Feedback,
    ) -> Result<Interview>;

    /// Lists the most recent interviews for a user, newest first.
    async fn list_interviews(&self, user_id: &str, limit: i64) -> Result<Vec<Interview>>;
}

/// A wrapper around the `PgPool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Creates a new `Db` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl InterviewStore for Db {
    async fn record_interview(
        &self,
        session_id: Uuid,
        user_id: &str,
        job_id: Option<&str>,
        transcript: &[TranscriptEntry],
        feedback: &Feedback,
    ) -> Result<Interview> {
        let transcript_json = serde_json::to_value(transcript)?;
        let feedback_json = serde_json::to_value(feedback)?;

        let interview = sqlx::query_as::<_, Interview>(
            r#"
            INSERT INTO interviews (id, user_id, job_id, transcript, feedback_report)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
                SET transcript = EXCLUDED.transcript,
                    feedback_report = EXCLUDED.feedback_report
            RETURNING id, user_id, job_id, transcript, feedback_report, created_at
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(job_id)
        .bind(transcript_json)
        .bind(feedback_json)
        .fetch_one(&self.pool)
        .await?;
        Ok(interview)
    }

    async fn list_interviews(&self, user_id: &str, limit: i64) -> Result<Vec<Interview>> {
        let interviews = sqlx::query_as::<_, Interview>(
            r#"
            SELECT id, user_id, job_id, transcript, feedback_report, created_at
            FROM interviews
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(interviews)
    }
}
