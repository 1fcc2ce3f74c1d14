//! API and Database Models
//!
//! This module defines the data structures used for database mapping with
//! `sqlx` and for generating OpenAPI documentation with `utoipa`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One persisted interview record: a completed session's transcript and
/// feedback, keyed by the session id.
#[derive(Serialize, Deserialize, ToSchema, FromRow, Debug, Clone)]
pub struct Interview {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub user_id: String,
    pub job_id: Option<String>,
    /// Serialized `(speaker, text)` transcript.
    #[schema(value_type = Object)]
    pub transcript: serde_json::Value,
    /// Serialized evaluation: score, verdict, summary, strengths, improvements.
    #[schema(value_type = Object)]
    pub feedback_report: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
