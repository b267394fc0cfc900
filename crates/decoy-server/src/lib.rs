//! Decoy: a session-scoped test double for HTTP and gRPC traffic.
//!
//! Tests register queued expectations for a session, point the system under
//! test at `/{session-id}/...`, and afterwards inspect the session error log
//! to decide whether the traffic matched. Matched responses are replayed;
//! mismatches answer 501 (HTTP) or an empty OK payload (gRPC) and are
//! recorded.

pub mod api;
pub mod expectation;
pub mod grpc;
pub mod session;
