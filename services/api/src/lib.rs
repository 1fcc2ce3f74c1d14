//! CareerFlow Interview API Library Crate
//!
//! This library contains all the core logic for the mock-interview web
//! service: application state, database access, REST handlers, the WebSocket
//! session engine, and routing. The `bin/api.rs` binary is a thin wrapper
//! around this library.

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
