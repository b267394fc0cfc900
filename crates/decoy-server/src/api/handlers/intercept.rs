//! Live-traffic interception: any request under a session-id prefix.

use crate::api::router::InterceptTarget;
use crate::api::types::{collect_body, json_response, message_response};
use crate::expectation::{lenient_json_body, IncomingCall};
use crate::session::SessionRegistry;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::debug;

/// ANY /{session-id}{/path}
///
/// A mismatch against the consumed expectation (or an unknown session)
/// answers 501; the message also lands in the session error log, so test
/// code can distinguish "double failed" from "system under test failed".
pub async fn handle(
    target: InterceptTarget,
    req: Request<Incoming>,
    registry: Arc<SessionRegistry>,
) -> Response<Full<Bytes>> {
    let method = req.method().as_str().to_string();
    let raw_body = match collect_body(req).await {
        Ok(raw) => raw,
        Err(message) => return message_response(StatusCode::BAD_REQUEST, &message),
    };

    let Some(session) = registry.get(&target.session_id) else {
        debug!("Intercepted call for unknown session {}", target.session_id);
        return message_response(StatusCode::NOT_IMPLEMENTED, "Session with such id does not exist");
    };

    let call = IncomingCall {
        method,
        path: target.path,
        body: lenient_json_body(&raw_body),
        raw_body,
    };

    match session.match_http_request(call) {
        Ok(matched) => {
            let status = StatusCode::from_u16(matched.code).unwrap_or(StatusCode::OK);
            json_response(status, &matched.body)
        }
        Err(mismatch) => message_response(StatusCode::NOT_IMPLEMENTED, &mismatch.to_string()),
    }
}
