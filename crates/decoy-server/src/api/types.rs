//! Wire types and response builders for the configuration API.

use crate::expectation::{GrpcExpectationPayload, HttpExpectationPayload};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of `POST /session`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub id: Option<String>,
    /// When set, that session is deleted before the new one is installed.
    #[serde(default)]
    pub previous_id: Option<String>,
}

/// Body of `PUT /expectation`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddHttpExpectationRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub expectation: HttpExpectationPayload,
}

/// Body of `PUT /expectation/grpc`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddGrpcExpectationRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub expectation: GrpcExpectationPayload,
}

/// Body of `POST /grpc/enable`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableGrpcRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Success body of `POST /grpc/enable`.
#[derive(Debug, Serialize)]
pub struct EnableGrpcResponse {
    pub port: u16,
}

/// Body of `GET /errors`.
#[derive(Debug, Serialize)]
pub struct ErrorsResponse {
    pub errors: Vec<String>,
}

/// Every non-2xx configuration response carries this shape.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Response helper functions
// =============================================================================

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Build an HTTP response with the given status and body.
///
/// This function handles the unlikely case where Response::builder() fails
/// by returning a minimal 500 error response.
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Build an HTTP response with headers.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Create a `{"message": ...}` response
pub fn message_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &MessageResponse {
            message: message.to_string(),
        },
    )
}

/// Create a not found response
pub fn not_found() -> Response<Full<Bytes>> {
    message_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

/// Deserialize a JSON request body, treating an empty body as `{}` so that
/// field-presence validation produces the precise "missing" messages instead
/// of a parse error.
pub fn parse_json_request<T>(raw: &Bytes) -> Result<T, String>
where
    T: serde::de::DeserializeOwned + Default,
{
    if raw.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(raw).map_err(|e| format!("Invalid request JSON: {e}"))
}

/// Parse a query string into a flat key/value map (last occurrence wins).
pub fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let Some(query) = query else {
        return params;
    };
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(key)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| key.to_string());
        let value = urlencoding::decode(value)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| value.to_string());
        params.insert(key, value);
    }
    params
}
