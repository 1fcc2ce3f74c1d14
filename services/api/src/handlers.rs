//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for interview
//! history. It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::{
    db::InterviewStore,
    models::{ErrorResponse, Interview},
    state::AppState,
};

pub enum ApiError {
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// List the most recent interviews for a user.
#[utoipa::path(
    get,
    path = "/interviews/{user_id}",
    responses(
        (status = 200, description = "List of past interviews", body = [Interview]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("user_id" = String, Path, description = "The ID of the user")
    )
)]
pub async fn list_interviews(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Interview>>, ApiError> {
    let interviews = state.db.list_interviews(&user_id, 20).await?;
    Ok(Json(interviews))
}
