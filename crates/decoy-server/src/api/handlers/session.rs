//! Session lifecycle handlers: create, flush, gRPC enable.

use crate::api::types::{
    build_response, collect_body, json_response, message_response, parse_json_request,
    CreateSessionRequest, EnableGrpcRequest, EnableGrpcResponse,
};
use crate::grpc::GrpcEnableError;
use crate::session::{SessionId, SessionRegistry};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::error;

/// POST /session
///
/// Installs a fresh session; an unparseable `previousId` deletes nothing,
/// like any other unknown id.
pub async fn handle_create(
    req: Request<Incoming>,
    registry: Arc<SessionRegistry>,
) -> Response<Full<Bytes>> {
    let raw = match collect_body(req).await {
        Ok(raw) => raw,
        Err(message) => return message_response(StatusCode::BAD_REQUEST, &message),
    };
    let payload: CreateSessionRequest = match parse_json_request(&raw) {
        Ok(payload) => payload,
        Err(message) => return message_response(StatusCode::BAD_REQUEST, &message),
    };

    let Some(raw_id) = payload.id.filter(|id| !id.is_empty()) else {
        return message_response(StatusCode::BAD_REQUEST, "Missing session id");
    };
    let id = match SessionId::parse(&raw_id) {
        Ok(id) => id,
        Err(e) => return message_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let previous = payload
        .previous_id
        .and_then(|previous_id| SessionId::parse(&previous_id).ok());

    registry.create(id, previous).await;
    json_response(StatusCode::OK, &serde_json::json!({}))
}

/// DELETE /flush
pub async fn handle_flush(registry: Arc<SessionRegistry>) -> Response<Full<Bytes>> {
    registry.flush_all().await;
    build_response(StatusCode::RESET_CONTENT, "")
}

/// POST /grpc/enable
pub async fn handle_enable_grpc(
    req: Request<Incoming>,
    registry: Arc<SessionRegistry>,
) -> Response<Full<Bytes>> {
    let raw = match collect_body(req).await {
        Ok(raw) => raw,
        Err(message) => return message_response(StatusCode::BAD_REQUEST, &message),
    };
    let payload: EnableGrpcRequest = match parse_json_request(&raw) {
        Ok(payload) => payload,
        Err(message) => return message_response(StatusCode::BAD_REQUEST, &message),
    };

    let Some(raw_id) = payload.session_id.filter(|id| !id.is_empty()) else {
        return message_response(StatusCode::BAD_REQUEST, "Session id must be set");
    };
    let Some(session) = super::resolve_session(&registry, &raw_id) else {
        return message_response(StatusCode::BAD_REQUEST, "Session with such id does not exist");
    };

    match registry.enable_grpc(&session).await {
        Ok(port) => json_response(StatusCode::OK, &EnableGrpcResponse { port }),
        Err(e @ GrpcEnableError::PortExhausted) => {
            error!("gRPC enable failed for session {}: {}", session.id(), e);
            message_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
        Err(e @ GrpcEnableError::Bind(..)) => {
            error!("gRPC enable failed for session {}: {}", session.id(), e);
            message_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to start gRPC server")
        }
    }
}
