//! The HTTP surface: configuration API and live-traffic interception.
//!
//! ## Module Structure
//!
//! - `server`: accept loop
//! - `router`: path dispatch, including the `/{session-id}` catch-all
//! - `types`: wire types and response builders
//! - `handlers`: endpoint implementations

pub mod handlers;
pub mod router;
pub mod server;
pub mod types;

pub use server::ApiServer;
