//! Defines the WebSocket message protocol between the frontend and the
//! interview engine. Text payloads are JSON; audio travels as raw binary
//! frames in both directions.

use crate::ws::arbiter::AudioState;
use careerflow_core::{
    context::InterviewKind,
    evaluator::Feedback,
    stage::{Speaker, Stage},
};
use serde::{Deserialize, Serialize};

/// The first message a client must send after connecting. The server resolves
/// a user id from `user_id` or from the `sub` claim of `access_token`, and
/// rejects the session if neither yields one.
#[derive(Deserialize, Debug)]
pub struct Handshake {
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    #[serde(default)]
    pub interview_type: InterviewKind,
}

/// A text-mode message from the candidate.
#[derive(Deserialize, Debug)]
pub struct TextClientMessage {
    pub message: String,
}

/// Advisory UI events. Not required for correctness, but they make the
/// engine's thinking/speaking state observable by the peer.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Thinking { status: EventStatus },
    StageChange { stage: Stage },
    AudioState { state: AudioState },
    Processing { status: EventStatus },
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Start,
    End,
}

/// Messages sent from the server to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after a successful handshake.
    Config {
        interview_type: InterviewKind,
        job_title: String,
        user_name: String,
    },
    /// Advisory UI signal.
    Event {
        #[serde(flatten)]
        event: SessionEvent,
    },
    /// An interviewer utterance (text mode).
    Message { role: Speaker, content: String },
    /// The final evaluation. Sent exactly once, at or after ending.
    Feedback { data: Feedback },
    /// Reports a fatal error to the client.
    Error { message: String },
}

impl ServerMessage {
    pub fn event(event: SessionEvent) -> Self {
        ServerMessage::Event { event }
    }

    pub fn assistant_message(content: impl Into<String>) -> Self {
        ServerMessage::Message {
            role: Speaker::Interviewer,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_accepts_partial_identity() {
        let msg: Handshake =
            serde_json::from_str(r#"{"user_id": "u1", "interview_type": "TECHNICAL"}"#).unwrap();
        assert_eq!(msg.user_id.as_deref(), Some("u1"));
        assert!(msg.access_token.is_none());
        assert_eq!(msg.interview_type, InterviewKind::Technical);

        // interview_type defaults when absent.
        let msg: Handshake = serde_json::from_str(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(msg.interview_type, InterviewKind::Technical);
    }

    #[test]
    fn config_message_wire_shape() {
        let msg = ServerMessage::Config {
            interview_type: InterviewKind::Behavioral,
            job_title: "Backend Engineer".into(),
            user_name: "Ada".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "config",
                "interview_type": "BEHAVIORAL",
                "job_title": "Backend Engineer",
                "user_name": "Ada"
            })
        );
    }

    #[test]
    fn event_messages_flatten_their_payload() {
        let msg = ServerMessage::event(SessionEvent::Thinking {
            status: EventStatus::Start,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "event", "event": "thinking", "status": "start"})
        );

        let msg = ServerMessage::event(SessionEvent::AudioState {
            state: AudioState::Listening,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "event", "event": "audio_state", "state": "listening"})
        );

        let msg = ServerMessage::event(SessionEvent::StageChange {
            stage: Stage::GapChallenge,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "event", "event": "stage_change", "stage": "gap_challenge"})
        );
    }

    #[test]
    fn assistant_messages_use_the_assistant_role() {
        let msg = ServerMessage::assistant_message("Welcome!");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "message", "role": "assistant", "content": "Welcome!"})
        );
    }

    #[test]
    fn feedback_message_wire_shape() {
        let msg = ServerMessage::Feedback {
            data: Feedback {
                score: 64,
                verdict: "Hired".into(),
                summary: "Good".into(),
                strengths: vec!["clarity".into()],
                improvements: vec![],
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "feedback");
        assert_eq!(json["data"]["score"], 64);
        assert_eq!(json["data"]["strengths"][0], "clarity");
    }
}
