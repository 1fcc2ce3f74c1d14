//! Per-turn loop for typed interviews.
//!
//! One candidate message drives one controller step: record the answer, ask
//! the stage controller what comes next, and either generate the next
//! interviewer question or finish the interview and deliver feedback. A
//! disconnect before the interview ends discards the session without
//! evaluating or persisting anything.

use super::{
    protocol::{EventStatus, ServerMessage, SessionEvent, TextClientMessage},
    session::{InterviewSession, finalize_session, send_msg},
};
use crate::state::AppState;
use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use careerflow_core::{
    dialogue::DialogueEngine,
    stage::{Stage, StageController, StageDecision},
};
use futures_util::{
    StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) async fn run_text_session(
    state: &Arc<AppState>,
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut socket_rx: SplitStream<WebSocket>,
    mut session: InterviewSession,
) -> Result<()> {
    let controller = StageController::new();
    let engine = DialogueEngine::new(state.llm_client.clone());

    // The interviewer opens the conversation before any client input.
    ask_next_question(state, &mut socket_tx, &mut session, &controller, &engine).await?;

    while !session.state.ending {
        let Some(msg) = socket_rx.next().await else {
            info!("Client disconnected mid-interview; discarding session.");
            return Ok(());
        };
        match msg? {
            Message::Text(text) => {
                let client_msg = match serde_json::from_str::<TextClientMessage>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(error = ?e, "Ignoring malformed client message");
                        continue;
                    }
                };
                let answer = client_msg.message.trim();
                if answer.is_empty() {
                    debug!("Ignoring empty candidate message");
                    continue;
                }
                session.state.record_answer(answer);
                ask_next_question(state, &mut socket_tx, &mut session, &controller, &engine)
                    .await?;
            }
            Message::Close(_) => {
                info!("Client closed the connection mid-interview; discarding session.");
                return Ok(());
            }
            _ => {}
        }
    }

    // Ending reached: evaluate, persist, and deliver the results.
    let feedback = finalize_session(state, &mut session).await;
    let closing = format!(
        "**Interview Results**\n\n{}. Your interview score is {} out of 100.\n\n{}",
        feedback.verdict, feedback.score, feedback.summary
    );
    send_msg(&mut socket_tx, ServerMessage::Feedback { data: feedback }).await?;
    send_msg(&mut socket_tx, ServerMessage::assistant_message(closing)).await?;

    Ok(())
}

/// Runs one controller step and, on `Ask`, generates and sends the next
/// interviewer question. On `Finish` the session's ending flag is set and the
/// client is told the interview has moved past its last stage.
async fn ask_next_question(
    state: &Arc<AppState>,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    session: &mut InterviewSession,
    controller: &StageController,
    engine: &DialogueEngine,
) -> Result<()> {
    send_msg(
        socket_tx,
        ServerMessage::event(SessionEvent::Thinking {
            status: EventStatus::Start,
        }),
    )
    .await?;

    match controller.next_action(&mut session.state) {
        StageDecision::Ask(stage) => {
            let question = engine
                .next_utterance(stage, &session.context, &session.state.transcript)
                .await;
            session.state.record_question(&question);

            send_msg(
                socket_tx,
                ServerMessage::event(SessionEvent::Thinking {
                    status: EventStatus::End,
                }),
            )
            .await?;
            send_msg(
                socket_tx,
                ServerMessage::event(SessionEvent::StageChange { stage }),
            )
            .await?;
            send_msg(socket_tx, ServerMessage::assistant_message(question)).await?;
        }
        StageDecision::Finish => {
            send_msg(
                socket_tx,
                ServerMessage::event(SessionEvent::Thinking {
                    status: EventStatus::End,
                }),
            )
            .await?;
            send_msg(
                socket_tx,
                ServerMessage::event(SessionEvent::StageChange { stage: Stage::End }),
            )
            .await?;
        }
    }

    Ok(())
}
