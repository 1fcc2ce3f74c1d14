//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, the interview WebSocket endpoints, and OpenAPI
//! documentation.

use crate::{
    handlers,
    models::{ErrorResponse, Interview},
    state::AppState,
    ws::{ws_text_handler, ws_voice_handler},
};

use axum::{Router, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::list_interviews),
    components(schemas(Interview, ErrorResponse)),
    tags(
        (name = "CareerFlow Interview API", description = "Mock interview sessions and history")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/interviews/{user_id}", get(handlers::list_interviews))
        .route("/ws/interview/{job_id}", get(ws_voice_handler))
        .route("/ws/interview/text/{job_id}", get(ws_text_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI routes.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
