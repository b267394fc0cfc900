//! Expectation registration handlers.

use crate::api::types::{
    collect_body, json_response, message_response, parse_json_request, AddGrpcExpectationRequest,
    AddHttpExpectationRequest,
};
use crate::expectation::{GrpcExpectation, HttpExpectation};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::debug;

use crate::session::SessionRegistry;

/// PUT /expectation
pub async fn handle_add_http(
    req: Request<Incoming>,
    registry: Arc<SessionRegistry>,
) -> Response<Full<Bytes>> {
    let raw = match collect_body(req).await {
        Ok(raw) => raw,
        Err(message) => return message_response(StatusCode::BAD_REQUEST, &message),
    };
    let payload: AddHttpExpectationRequest = match parse_json_request(&raw) {
        Ok(payload) => payload,
        Err(message) => return message_response(StatusCode::BAD_REQUEST, &message),
    };

    let Some(raw_id) = payload.session_id.filter(|id| !id.is_empty()) else {
        return message_response(StatusCode::BAD_REQUEST, "Session id must be set");
    };
    let Some(session) = super::resolve_session(&registry, &raw_id) else {
        return message_response(StatusCode::BAD_REQUEST, "Session with such id does not exist");
    };

    let expectation = match HttpExpectation::from_payload(payload.expectation) {
        Ok(expectation) => expectation,
        Err(e) => {
            debug!("Rejected HTTP expectation for session {}: {}", session.id(), e);
            return message_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };
    session.add_http_expectation(expectation);
    debug!("HTTP expectation queued for session {}", session.id());
    json_response(StatusCode::OK, &serde_json::json!({}))
}

/// PUT /expectation/grpc
pub async fn handle_add_grpc(
    req: Request<Incoming>,
    registry: Arc<SessionRegistry>,
) -> Response<Full<Bytes>> {
    let raw = match collect_body(req).await {
        Ok(raw) => raw,
        Err(message) => return message_response(StatusCode::BAD_REQUEST, &message),
    };
    let payload: AddGrpcExpectationRequest = match parse_json_request(&raw) {
        Ok(payload) => payload,
        Err(message) => return message_response(StatusCode::BAD_REQUEST, &message),
    };

    let Some(raw_id) = payload.session_id.filter(|id| !id.is_empty()) else {
        return message_response(StatusCode::BAD_REQUEST, "Session id must be set");
    };
    let Some(session) = super::resolve_session(&registry, &raw_id) else {
        return message_response(StatusCode::BAD_REQUEST, "Session with such id does not exist");
    };

    let expectation = match GrpcExpectation::from_payload(payload.expectation) {
        Ok(expectation) => expectation,
        Err(e) => {
            debug!("Rejected gRPC expectation for session {}: {}", session.id(), e);
            return message_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };
    session.add_grpc_expectation(expectation);
    debug!("gRPC expectation queued for session {}", session.id());
    json_response(StatusCode::OK, &serde_json::json!({}))
}
