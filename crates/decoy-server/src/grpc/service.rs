//! Per-session unary dispatch.
//!
//! Every request a session listener accepts goes through one explicit
//! dispatch path keyed by the request URI; there is no service registry or
//! catch-all handler chain. The owning session is re-resolved from the
//! registry on every call, so a listener that outlives its session by a few
//! in-flight requests degrades to empty-payload replies.

use super::codec::RawCodec;
use crate::session::{SessionId, SessionRegistry};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::sync::Arc;
use tonic::body::BoxBody;
use tonic::Status;
use tracing::debug;

/// The dispatch closure state captured at listener startup.
#[derive(Clone)]
pub(crate) struct UnaryDispatch {
    registry: Arc<SessionRegistry>,
    session_id: SessionId,
}

impl UnaryDispatch {
    pub(crate) fn new(registry: Arc<SessionRegistry>, session_id: SessionId) -> Self {
        Self {
            registry,
            session_id,
        }
    }

    /// Serve one HTTP/2 request as a unary gRPC call.
    pub(crate) async fn call(&self, req: Request<Incoming>) -> Response<BoxBody> {
        let path = req.uri().path().to_string();
        let mut grpc = tonic::server::Grpc::new(RawCodec);
        grpc.unary(
            MatchCall {
                registry: Arc::clone(&self.registry),
                session_id: self.session_id.clone(),
                path,
            },
            req,
        )
        .await
    }
}

struct MatchCall {
    registry: Arc<SessionRegistry>,
    session_id: SessionId,
    path: String,
}

impl tonic::server::UnaryService<Bytes> for MatchCall {
    type Response = Bytes;
    type Future = std::future::Ready<Result<tonic::Response<Bytes>, Status>>;

    fn call(&mut self, request: tonic::Request<Bytes>) -> Self::Future {
        let payload = hex::encode(request.into_inner());
        let reply = match self.registry.get(&self.session_id) {
            Some(session) => match session.match_grpc_call(&self.path, &payload) {
                Ok(bytes) => bytes,
                Err(mismatch) => {
                    debug!("gRPC mismatch on session {}: {}", self.session_id, mismatch);
                    Bytes::new()
                }
            },
            None => {
                debug!(
                    "gRPC call to {} for deleted session {}",
                    self.path, self.session_id
                );
                Bytes::new()
            }
        };
        std::future::ready(Ok(tonic::Response::new(reply)))
    }
}
