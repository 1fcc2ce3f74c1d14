//! WebSocket Session Engine
//!
//! This module contains the core logic for conducting mock interviews over
//! WebSockets. It is structured into submodules for clarity:
//!
//! - `protocol`: Defines the JSON-based message format for client-server communication.
//! - `session`: Manages the connection lifecycle, from handshake to termination.
//! - `text`: The per-turn loop for typed interviews.
//! - `voice`: The per-turn loop for spoken interviews.
//! - `vad`: Voice activity detection and utterance segmentation.
//! - `arbiter`: The audio-turn state machine gating when incoming audio counts
//!   as candidate speech.

pub mod arbiter;
pub mod protocol;
pub mod session;
mod text;
pub mod vad;
mod voice;

pub use session::{ws_text_handler, ws_voice_handler};
