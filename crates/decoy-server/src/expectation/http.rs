//! HTTP expectations: registration payloads, validation and the match rules.

use super::field_path::FieldPath;
use super::{pretty_json, ExpectationError};
use bytes::Bytes;
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// How the expected body is compared against the live request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Structural JSON equality (after wildcard masking).
    Json,
    /// Raw request bytes decoded as UTF-8 text, exact string compare.
    Plain,
    /// Raw request bytes hex-encoded (lowercase), exact string compare.
    Binary,
}

impl BodyType {
    fn parse(raw: &str) -> Result<Self, ExpectationError> {
        match raw {
            "json" => Ok(Self::Json),
            "plain" => Ok(Self::Plain),
            "binary" => Ok(Self::Binary),
            _ => Err(ExpectationError::InvalidBodyType),
        }
    }
}

/// The response replayed to the live caller on a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedResponse {
    pub code: u16,
    pub body: Value,
}

impl MatchedResponse {
    fn from_payload(payload: ResponsePayload) -> Result<Self, ExpectationError> {
        let code = payload.code.unwrap_or(200);
        if StatusCode::from_u16(code).is_err() {
            return Err(ExpectationError::InvalidResponseCode);
        }
        Ok(Self {
            code,
            body: payload.body.unwrap_or_else(empty_object),
        })
    }
}

/// Wire shape of a `PUT /expectation` registration (without the session id).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpExpectationPayload {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub response: Option<ResponsePayload>,
    #[serde(default)]
    pub optional_fields: Option<Vec<String>>,
    #[serde(default)]
    pub body_type: Option<String>,
    /// Legacy alias: `raw: true` means `bodyType: "plain"`.
    #[serde(default)]
    pub raw: Option<bool>,
}

/// Wire shape of the `response` field of a registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePayload {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub body: Option<Value>,
}

/// A single queued HTTP expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpExpectation {
    path: String,
    method: String,
    body: Value,
    body_type: BodyType,
    optional_fields: Vec<FieldPath>,
    response: MatchedResponse,
}

/// One live request as the matcher sees it.
///
/// `path` is the session-relative remainder (query string included, one
/// trailing slash stripped, `/` when empty) and `body` the leniently parsed
/// JSON payload.
#[derive(Debug, Clone)]
pub struct IncomingCall {
    pub method: String,
    pub path: String,
    pub body: Value,
    pub raw_body: Bytes,
}

/// Why a popped expectation rejected the live request.
///
/// `Display` is the verbatim string logged to the session and returned to
/// the caller with status 501.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpMismatch {
    #[error("There were no expectations for request {path} with {body}")]
    NoExpectation { path: String, body: String },
    #[error("Expected method {expected} does not match actual {actual}")]
    Method { expected: String, actual: String },
    #[error("Expected path {expected} does not match actual {actual} {body}")]
    Path {
        expected: String,
        actual: String,
        body: String,
    },
    #[error("Expected request body {expected} does not match actual {actual}")]
    Body { expected: String, actual: String },
    #[error("Expected raw body {expected} does not match actual {actual}")]
    RawBody { expected: String, actual: String },
}

impl HttpExpectation {
    /// Validate a registration payload.
    pub fn from_payload(payload: HttpExpectationPayload) -> Result<Self, ExpectationError> {
        let path = payload.path.filter(|p| !p.is_empty());
        let method = payload.method.filter(|m| !m.is_empty());
        let body = payload.body.filter(|b| !b.is_null());
        let (Some(path), Some(method), Some(body), Some(response)) =
            (path, method, body, payload.response)
        else {
            return Err(ExpectationError::MissingRequiredFields);
        };

        let body_type = match payload.body_type.as_deref() {
            Some(raw_type) => BodyType::parse(raw_type)?,
            None if payload.raw == Some(true) => BodyType::Plain,
            None => BodyType::Json,
        };

        let mut optional_fields = Vec::new();
        for accessor in payload.optional_fields.unwrap_or_default() {
            optional_fields.push(FieldPath::parse(&accessor)?);
        }

        Ok(Self {
            path: normalize_expected_path(path),
            method,
            body,
            body_type,
            optional_fields,
            response: MatchedResponse::from_payload(response)?,
        })
    }

    /// Compare against a live request.
    ///
    /// Wildcard masking is applied to BOTH bodies before any comparison, so
    /// a field listed as optional can differ or be absent on either side.
    /// The expectation is consumed either way; a mismatch reports the first
    /// failing stage.
    pub fn matches(mut self, call: &mut IncomingCall) -> Result<MatchedResponse, HttpMismatch> {
        for field in &self.optional_fields {
            field.mask(&mut self.body);
            field.mask(&mut call.body);
        }

        if self.method != call.method {
            return Err(HttpMismatch::Method {
                expected: self.method,
                actual: call.method.clone(),
            });
        }

        if self.path != call.path {
            return Err(HttpMismatch::Path {
                expected: self.path,
                actual: call.path.clone(),
                body: pretty_json(&call.body),
            });
        }

        match self.body_type {
            BodyType::Json => {
                if !json_bodies_equal(&self.body, &call.body) {
                    return Err(HttpMismatch::Body {
                        expected: pretty_json(&self.body),
                        actual: pretty_json(&call.body),
                    });
                }
            }
            BodyType::Plain => {
                let actual = String::from_utf8_lossy(&call.raw_body).into_owned();
                if self.body.as_str() != Some(actual.as_str()) {
                    return Err(raw_mismatch(&self.body, actual));
                }
            }
            BodyType::Binary => {
                let actual = hex::encode(&call.raw_body);
                if self.body.as_str() != Some(actual.as_str()) {
                    return Err(raw_mismatch(&self.body, actual));
                }
            }
        }

        Ok(self.response)
    }

    /// `{path} with {pretty body}`, the form used in unconsumed-queue reports.
    pub fn describe(&self) -> String {
        format!("{} with {}", self.path, pretty_json(&self.body))
    }
}

/// Parse request bytes the way the matcher sees them: anything that is not
/// valid JSON (an empty body included) becomes `{}`.
pub fn lenient_json_body(raw: &[u8]) -> Value {
    serde_json::from_slice(raw).unwrap_or_else(|_| empty_object())
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn normalize_expected_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

/// Structural equality, plus the legacy rule that an empty array and an
/// empty object count as equal in any combination.
fn json_bodies_equal(expected: &Value, actual: &Value) -> bool {
    expected == actual || (is_empty_container(expected) && is_empty_container(actual))
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn raw_mismatch(expected: &Value, actual: String) -> HttpMismatch {
    let expected = match expected.as_str() {
        Some(text) => text.to_string(),
        None => expected.to_string(),
    };
    HttpMismatch::RawBody { expected, actual }
}
