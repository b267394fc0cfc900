//! Endpoint handlers for the configuration API and live interception.

pub mod errors;
pub mod expectation;
pub mod intercept;
pub mod session;
pub mod system;

use crate::session::{Session, SessionId, SessionRegistry};
use std::sync::Arc;

/// Look up a session from a raw id string. A string that does not even have
/// the id shape behaves like an unknown id.
pub(crate) fn resolve_session(registry: &SessionRegistry, raw_id: &str) -> Option<Arc<Session>> {
    SessionId::parse(raw_id).ok().and_then(|id| registry.get(&id))
}
