//! Session error inspection.

use crate::api::types::{json_response, message_response, parse_query_string, ErrorsResponse};
use crate::session::SessionRegistry;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;

/// GET /errors?sessionId=...
///
/// Reading the report does not clear it; a session accumulates errors until
/// it is replaced or deleted.
pub async fn handle_get(
    query: Option<&str>,
    registry: Arc<SessionRegistry>,
) -> Response<Full<Bytes>> {
    let params = parse_query_string(query);
    let Some(raw_id) = params.get("sessionId").filter(|id| !id.is_empty()) else {
        return message_response(StatusCode::BAD_REQUEST, "Missing session id in request");
    };
    let Some(session) = super::resolve_session(&registry, raw_id) else {
        return message_response(StatusCode::BAD_REQUEST, "Session with such id does not exist");
    };

    json_response(
        StatusCode::OK,
        &ErrorsResponse {
            errors: session.error_report(),
        },
    )
}
