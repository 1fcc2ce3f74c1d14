//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources: the interview store and the external collaborator
//! clients. Per-session interview state is NOT kept here; each WebSocket
//! session owns its own state exclusively.

use crate::db::InterviewStore;
use careerflow_core::{context::ContextService, llm_client::LlmClient, speech::SpeechService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn InterviewStore>,
    pub context_service: Arc<dyn ContextService>,
    pub llm_client: Arc<dyn LlmClient>,
    pub speech_service: Arc<dyn SpeechService>,
}
