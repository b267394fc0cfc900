//! SessionRegistry - lifecycle management for sessions.
//!
//! This module handles creating, replacing, deleting, and flushing sessions,
//! each owning its own expectation queues and (optionally) a gRPC listener.

use super::{Session, SessionId};
use crate::grpc::{GrpcEnableError, GrpcListenerManager};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Owns every live session and the gRPC listener manager that serves them.
pub struct SessionRegistry {
    /// Active sessions by id
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    grpc: GrpcListenerManager,
}

impl SessionRegistry {
    pub fn new(grpc: GrpcListenerManager) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            grpc,
        }
    }

    /// Install a fresh session under `id`.
    ///
    /// The previous session (if named) and any session already stored under
    /// `id` are removed in the same write-lock scope as the insert, so no
    /// observer can see old and new state side by side. Their listeners are
    /// torn down after the lock is released.
    pub async fn create(&self, id: SessionId, previous: Option<SessionId>) {
        let mut displaced = Vec::new();
        {
            let mut sessions = self.sessions.write();
            if let Some(previous_id) = previous {
                if let Some(old) = sessions.remove(&previous_id) {
                    displaced.push(old);
                }
            }
            let session = Arc::new(Session::new(id.clone()));
            if let Some(old) = sessions.insert(id.clone(), session) {
                displaced.push(old);
            }
        }
        for session in displaced {
            self.grpc.teardown(&session).await;
            info!("Session {} deleted", session.id());
        }
        info!("Session {} created", id);
    }

    /// Look up a live session. Never creates.
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Delete a session and tear down its gRPC listener. No-op if absent.
    pub async fn delete(&self, id: &SessionId) {
        let removed = { self.sessions.write().remove(id) };
        if let Some(session) = removed {
            self.grpc.teardown(&session).await;
            info!("Session {} deleted", id);
        }
    }

    /// Drop every session and release every gRPC listener.
    pub async fn flush_all(&self) -> usize {
        let drained: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write();
            sessions.drain().map(|(_, session)| session).collect()
        };
        let flushed = drained.len();
        for session in &drained {
            self.grpc.teardown(session).await;
        }
        if flushed > 0 {
            info!("Flushed {} sessions", flushed);
        }
        flushed
    }

    /// Start (or look up) the session's gRPC listener; returns its port.
    pub async fn enable_grpc(
        self: &Arc<Self>,
        session: &Arc<Session>,
    ) -> Result<u16, GrpcEnableError> {
        self.grpc.enable(self, session).await
    }

    /// Live session count.
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::HttpMismatch;
    use crate::expectation::IncomingCall;
    use bytes::Bytes;
    use serde_json::json;
    use std::net::{IpAddr, Ipv4Addr};

    fn registry() -> SessionRegistry {
        SessionRegistry::new(GrpcListenerManager::new(IpAddr::V4(Ipv4Addr::LOCALHOST)))
    }

    fn id(fill: char) -> SessionId {
        SessionId::parse(&fill.to_string().repeat(64)).unwrap()
    }

    fn call(path: &str) -> IncomingCall {
        IncomingCall {
            method: "GET".to_string(),
            path: path.to_string(),
            body: json!({}),
            raw_body: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry();
        registry.create(id('a'), None).await;
        assert!(registry.get(&id('a')).is_some());
        assert!(registry.get(&id('b')).is_none());
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_create_deletes_previous_session() {
        let registry = registry();
        registry.create(id('a'), None).await;
        registry.create(id('b'), Some(id('a'))).await;
        assert!(registry.get(&id('a')).is_none());
        assert!(registry.get(&id('b')).is_some());
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_create_with_unknown_previous_is_harmless() {
        let registry = registry();
        registry.create(id('a'), Some(id('z'))).await;
        assert!(registry.get(&id('a')).is_some());
    }

    #[tokio::test]
    async fn test_recreate_starts_from_clean_state() {
        let registry = registry();
        registry.create(id('a'), None).await;
        let first = registry.get(&id('a')).unwrap();
        let _ = first.match_http_request(call("/p"));
        assert_eq!(first.error_report().len(), 1);

        registry.create(id('a'), None).await;
        let second = registry.get(&id('a')).unwrap();
        assert!(second.error_report().is_empty());

        // The old handle keeps its history but is no longer reachable.
        let err = second.match_http_request(call("/p")).unwrap_err();
        assert!(matches!(err, HttpMismatch::NoExpectation { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let registry = registry();
        registry.create(id('a'), None).await;
        registry.delete(&id('a')).await;
        registry.delete(&id('a')).await;
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_flush_all_clears_every_session() {
        let registry = registry();
        registry.create(id('a'), None).await;
        registry.create(id('b'), None).await;
        registry.create(id('c'), None).await;
        assert_eq!(registry.flush_all().await, 3);
        assert_eq!(registry.count(), 0);
        assert_eq!(registry.flush_all().await, 0);
    }
}
