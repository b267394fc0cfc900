//! Session management for the test double.
//!
//! This module provides:
//! - `SessionId`: validated 64-char client-minted identifier
//! - `Session`: one client's expectation queues and error log
//! - `SessionRegistry`: lifecycle management keyed by session id
//!
//! Sessions never expire on their own; they live until replaced by a
//! follow-up session, deleted through their creator, or flushed globally.
//!
//! ## Module Structure
//!
//! - `id`: session id validation
//! - `core`: the `Session` struct and matching entry points
//! - `registry`: `SessionRegistry` lifecycle management

mod core;
mod id;
mod registry;

pub use core::Session;
pub use id::{InvalidSessionId, SessionId, SESSION_ID_LEN};
pub use registry::SessionRegistry;
