//! Per-turn loop for spoken interviews.
//!
//! Incoming binary frames are gated by the turn arbiter, segmented by the
//! voice-activity pipeline, and transcribed; each finalized utterance drives
//! one controller step, whose reply is synthesized and streamed back as raw
//! audio. Frames arriving while the engine is thinking or speaking, or within
//! the post-playback cooldown, are dropped before they reach the segmenter.

use super::{
    arbiter::{AudioState, TurnArbiter},
    protocol::{EventStatus, ServerMessage, SessionEvent},
    session::{InterviewSession, finalize_session, send_msg},
    vad::VadSegmenter,
};
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket};
use careerflow_core::{
    dialogue::DialogueEngine,
    speech::SpeechService,
    stage::{Stage, StageController, StageDecision},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info, warn};

pub(crate) async fn run_voice_session(
    state: &Arc<AppState>,
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut socket_rx: SplitStream<WebSocket>,
    mut session: InterviewSession,
) -> Result<()> {
    let controller = StageController::new();
    let engine = DialogueEngine::new(state.llm_client.clone());
    let mut arbiter = TurnArbiter::new();
    let mut vad = VadSegmenter::new();

    // The interviewer speaks first.
    match step(
        state,
        &mut socket_tx,
        &mut session,
        &controller,
        &engine,
        &mut arbiter,
    )
    .await?
    {
        StageDecision::Ask(_) => {}
        StageDecision::Finish => {
            // A fresh session never finishes on its first step, but guard
            // against it rather than looping on a closed interview.
            return deliver_results(state, &mut socket_tx, &mut session).await;
        }
    }

    while !session.state.ending {
        let Some(msg) = socket_rx.next().await else {
            info!("Client disconnected mid-interview; discarding session.");
            return Ok(());
        };
        match msg? {
            Message::Binary(data) => {
                let now = Instant::now();
                if !arbiter.accepts_frame(now) {
                    continue;
                }
                let Some(segment) = vad.push_frame(&data, now) else {
                    continue;
                };

                arbiter.begin_thinking();
                send_audio_state(&mut socket_tx, &arbiter).await?;

                let answer = match state.speech_service.transcribe(segment).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = ?e, "Transcription failed; treating utterance as empty");
                        String::new()
                    }
                };
                if answer.trim().is_empty() {
                    // Nothing usable was said; resume listening without
                    // advancing the turn counter.
                    debug!("Empty transcription; resuming listening");
                    arbiter.begin_listening(Instant::now());
                    send_audio_state(&mut socket_tx, &arbiter).await?;
                    continue;
                }

                debug!(answer = %answer.trim(), "Candidate utterance transcribed");
                session.state.record_answer(answer.trim());
                step(
                    state,
                    &mut socket_tx,
                    &mut session,
                    &controller,
                    &engine,
                    &mut arbiter,
                )
                .await?;
            }
            Message::Close(_) => {
                info!("Client closed the connection mid-interview; discarding session.");
                return Ok(());
            }
            Message::Text(_) => {
                warn!("Ignoring unexpected text frame on voice session");
            }
            _ => {}
        }
    }

    deliver_results(state, &mut socket_tx, &mut session).await
}

/// One controller step: on `Ask`, generates the reply, speaks it, and returns
/// to listening. On `Finish` the ending flag is set and the loop's exit path
/// handles evaluation.
async fn step(
    state: &Arc<AppState>,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    session: &mut InterviewSession,
    controller: &StageController,
    engine: &DialogueEngine,
    arbiter: &mut TurnArbiter,
) -> Result<StageDecision> {
    if arbiter.state() != AudioState::Thinking {
        arbiter.begin_thinking();
        send_audio_state(socket_tx, arbiter).await?;
    }

    let decision = controller.next_action(&mut session.state);
    match decision {
        StageDecision::Ask(stage) => {
            let reply = engine
                .next_utterance(stage, &session.context, &session.state.transcript)
                .await;
            session.state.record_question(&reply);

            send_msg(
                socket_tx,
                ServerMessage::event(SessionEvent::StageChange { stage }),
            )
            .await?;
            speak(state, socket_tx, arbiter, &reply).await?;
        }
        StageDecision::Finish => {
            send_msg(
                socket_tx,
                ServerMessage::event(SessionEvent::StageChange { stage: Stage::End }),
            )
            .await?;
        }
    }
    Ok(decision)
}

/// Synthesizes `text`, streams it to the client, waits out its play time, and
/// transitions the arbiter back to listening.
async fn speak(
    state: &Arc<AppState>,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    arbiter: &mut TurnArbiter,
    text: &str,
) -> Result<()> {
    arbiter.begin_speaking();
    send_audio_state(socket_tx, arbiter).await?;

    let audio = state
        .speech_service
        .synthesize(text)
        .await
        .context("speech synthesis failed")?;
    let wait = TurnArbiter::speech_wait(audio.len());
    socket_tx.send(Message::Binary(audio.into())).await?;

    // Hold until the client has (approximately) finished playback, so the
    // microphone does not pick up the tail of our own voice.
    tokio::time::sleep(wait).await;

    arbiter.begin_listening(Instant::now());
    send_audio_state(socket_tx, arbiter).await?;
    Ok(())
}

async fn send_audio_state(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    arbiter: &TurnArbiter,
) -> Result<()> {
    send_msg(
        socket_tx,
        ServerMessage::event(SessionEvent::AudioState {
            state: arbiter.state(),
        }),
    )
    .await
}

/// Closes out a finished interview: a spoken goodbye, evaluation, the
/// feedback payload, and a short spoken summary of the verdict.
async fn deliver_results(
    state: &Arc<AppState>,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    session: &mut InterviewSession,
) -> Result<()> {
    send_msg(
        socket_tx,
        ServerMessage::event(SessionEvent::Processing {
            status: EventStatus::Start,
        }),
    )
    .await?;

    let goodbye = "Thank you for your time today. We'll review your responses \
                   and have your feedback ready in just a moment.";
    match state.speech_service.synthesize(goodbye).await {
        Ok(audio) => socket_tx.send(Message::Binary(audio.into())).await?,
        Err(e) => warn!(error = ?e, "Failed to synthesize goodbye message"),
    }

    let feedback = finalize_session(state, session).await;
    let spoken_summary = format!(
        "{}. Your score is {} out of 100. {}",
        feedback.verdict, feedback.score, feedback.summary
    );
    send_msg(socket_tx, ServerMessage::Feedback { data: feedback }).await?;
    match state.speech_service.synthesize(&spoken_summary).await {
        Ok(audio) => socket_tx.send(Message::Binary(audio.into())).await?,
        Err(e) => warn!(error = ?e, "Failed to synthesize spoken feedback"),
    }

    send_msg(
        socket_tx,
        ServerMessage::event(SessionEvent::Processing {
            status: EventStatus::End,
        }),
    )
    .await?;
    let _ = socket_tx.send(Message::Close(None)).await;
    Ok(())
}
