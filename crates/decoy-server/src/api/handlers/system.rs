//! System endpoints.

use crate::api::types::json_response;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// GET /health
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
}
