//! Manages the WebSocket connection lifecycle for an interview session.
//!
//! Each accepted connection performs a bounded-time authentication handshake,
//! resolves the immutable interview context from the profile/gap-analysis
//! collaborator, and then hands off to the mode-specific per-turn loop (text
//! or voice). Session state is owned exclusively by this connection's task;
//! there is no global session registry.

use super::{
    protocol::{Handshake, ServerMessage},
    text::run_text_session,
    voice::run_voice_session,
};
use crate::{db::InterviewStore, state::AppState};
use anyhow::Result;
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use base64::Engine;
use careerflow_core::{
    context::{ContextService, InterviewContext, InterviewKind},
    evaluator::{Evaluator, Feedback},
    stage::SessionState,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

/// How long the client has to send its handshake message.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether a session exchanges JSON text turns or raw binary audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionMode {
    Text,
    Voice,
}

/// Everything one interview session owns. Created after a successful
/// handshake, destroyed when the connection closes.
pub(crate) struct InterviewSession {
    pub id: Uuid,
    pub user_id: String,
    pub job_id: String,
    pub kind: InterviewKind,
    pub context: InterviewContext,
    pub state: SessionState,
}

/// Axum handler for the text-mode interview endpoint.
pub async fn ws_text_handler(
    ws: WebSocketUpgrade,
    Path(job_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, job_id, SessionMode::Text))
}

/// Axum handler for the voice-mode interview endpoint.
pub async fn ws_voice_handler(
    ws: WebSocketUpgrade,
    Path(job_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, job_id, SessionMode::Voice))
}

/// Entry point for a new connection: handshake, context resolution, and
/// dispatch into the per-turn loop.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, job_id: String, mode: SessionMode) {
    let session_id = Uuid::new_v4();
    let span = tracing::info_span!("interview_session", %session_id, ?mode);

    async move {
        info!("New WebSocket connection. Awaiting handshake...");
        let (mut socket_tx, mut socket_rx) = socket.split();

        // The first message must arrive within the handshake window.
        let handshake = match timeout(HANDSHAKE_TIMEOUT, socket_rx.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                match serde_json::from_str::<Handshake>(&text) {
                    Ok(handshake) => handshake,
                    Err(e) => {
                        warn!(error = ?e, "Malformed handshake");
                        let _ = send_msg(
                            &mut socket_tx,
                            ServerMessage::Error {
                                message: "Malformed handshake message".to_string(),
                            },
                        )
                        .await;
                        return;
                    }
                }
            }
            Ok(_) => {
                info!("Client disconnected or sent a non-text first message.");
                return;
            }
            Err(_) => {
                let _ = send_msg(
                    &mut socket_tx,
                    ServerMessage::Error {
                        message: "Auth timeout".to_string(),
                    },
                )
                .await;
                return;
            }
        };

        // Resolve an identity: explicit user_id wins, then the token's `sub`
        // claim. Without one the session is rejected before any state exists.
        let user_id = handshake
            .user_id
            .clone()
            .or_else(|| handshake.access_token.as_deref().and_then(user_id_from_token));
        let Some(user_id) = user_id else {
            warn!("No user_id provided and none could be extracted from token");
            let _ = send_msg(
                &mut socket_tx,
                ServerMessage::Error {
                    message: "Authentication required".to_string(),
                },
            )
            .await;
            return;
        };

        // Route params arrive as "job_18" or "73.0"; keep the digit run.
        // Text mode tolerates a digitless parameter and passes it through
        // unchanged; voice mode rejects it.
        let job_id = match (normalize_job_id(&job_id), mode) {
            (Some(id), _) => id,
            (None, SessionMode::Voice) => {
                let _ = send_msg(
                    &mut socket_tx,
                    ServerMessage::Error {
                        message: "Invalid job ID".to_string(),
                    },
                )
                .await;
                return;
            }
            (None, SessionMode::Text) => job_id,
        };

        let context = match state
            .context_service
            .resolve_context(&user_id, &job_id)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                error!(error = ?e, "Failed to resolve interview context");
                let _ = send_msg(
                    &mut socket_tx,
                    ServerMessage::Error {
                        message: format!("Failed to load interview context: {e}"),
                    },
                )
                .await;
                return;
            }
        };

        info!(
            job_title = %context.job.title,
            user_name = %context.user.name,
            interview_type = %handshake.interview_type,
            "Session initialized"
        );

        let session = InterviewSession {
            id: session_id,
            user_id,
            job_id,
            kind: handshake.interview_type,
            context,
            state: SessionState::new(),
        };

        if send_msg(
            &mut socket_tx,
            ServerMessage::Config {
                interview_type: session.kind,
                job_title: session.context.job.title.clone(),
                user_name: session.context.user.name.clone(),
            },
        )
        .await
        .is_err()
        {
            error!("Failed to send config message to client.");
            return;
        }

        let result = match mode {
            SessionMode::Text => run_text_session(&state, socket_tx, socket_rx, session).await,
            SessionMode::Voice => run_voice_session(&state, socket_tx, socket_rx, session).await,
        };
        if let Err(e) = result {
            error!(error = ?e, "Interview session terminated with error.");
        }
        info!("Interview session finished.");
    }
    .instrument(span)
    .await;
}

/// Extracts the `sub` claim from a JWT without verifying the signature. The
/// token is trusted because it originates from an authenticated frontend
/// session; only the identity inside it is needed here.
fn user_id_from_token(access_token: &str) -> Option<String> {
    let mut parts = access_token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    claims.get("sub")?.as_str().map(str::to_string)
}

/// Reduces a route job-id like "job_18" or "73.0" to its first contiguous
/// digit run. Returns `None` when the parameter contains no digits.
fn normalize_job_id(raw: &str) -> Option<String> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let digits: String = raw[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    Some(digits)
}

/// Serializes and sends a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}

/// Runs the evaluator and persists the resulting record.
///
/// The evaluator is infallible (it degrades to a zero-score fallback), so a
/// session that reaches this point always yields exactly one feedback record.
/// The persistence write is an idempotent upsert keyed by session id and is
/// retried once on transient failure.
pub(crate) async fn finalize_session(
    state: &Arc<AppState>,
    session: &mut InterviewSession,
) -> Feedback {
    let evaluator = Evaluator::new(state.llm_client.clone());
    let feedback = evaluator
        .evaluate(&session.context, &session.state.transcript)
        .await;
    session.state.set_feedback(feedback.clone());

    for attempt in 1..=2 {
        match state
            .db
            .record_interview(
                session.id,
                &session.user_id,
                Some(session.job_id.as_str()),
                &session.state.transcript,
                &feedback,
            )
            .await
        {
            Ok(_) => {
                info!(score = feedback.score, "Interview record persisted");
                break;
            }
            Err(e) if attempt == 1 => {
                warn!(error = ?e, "Persisting interview failed, retrying once");
            }
            Err(e) => {
                error!(error = ?e, "Failed to persist interview record");
            }
        }
    }

    feedback
}
