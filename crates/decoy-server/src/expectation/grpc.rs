//! gRPC expectations: hex-encoded request/response pairs keyed by method path.

use super::ExpectationError;
use bytes::Bytes;
use serde::Deserialize;

/// Wire shape of a `PUT /expectation/grpc` registration (without the
/// session id).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrpcExpectationPayload {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

/// A single queued gRPC expectation.
///
/// The request stays the caller's literal hex string and is compared against
/// the lowercase hex encoding of the inbound message; the response is decoded
/// once at registration and replayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcExpectation {
    path: String,
    request: String,
    response: Vec<u8>,
}

/// Why a popped gRPC expectation rejected the live call. `Display` is the
/// verbatim log string; the caller always receives an empty OK payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrpcMismatch {
    #[error("There were no expectations for gRPC request to {path} with {request}")]
    NoExpectation { path: String, request: String },
    #[error("Expected path {expected} does not match actual {actual}")]
    Path { expected: String, actual: String },
    #[error("Expected request {expected} does not match actual {actual} at path {path}")]
    Request {
        expected: String,
        actual: String,
        path: String,
    },
}

impl GrpcExpectation {
    /// Validate a registration payload. The three fields are individually
    /// required; the response must additionally be valid hex.
    pub fn from_payload(payload: GrpcExpectationPayload) -> Result<Self, ExpectationError> {
        let path = payload.path.ok_or(ExpectationError::MissingGrpcPath)?;
        let request = payload.request.ok_or(ExpectationError::MissingGrpcRequest)?;
        let encoded = payload
            .response
            .ok_or(ExpectationError::MissingGrpcResponse)?;
        let response = hex::decode(&encoded).map_err(|_| ExpectationError::InvalidGrpcResponseHex)?;
        Ok(Self {
            path,
            request,
            response,
        })
    }

    /// Compare against a live unary call; `request_hex` is the lowercase hex
    /// encoding of the inbound message bytes.
    pub fn matches(self, path: &str, request_hex: &str) -> Result<Bytes, GrpcMismatch> {
        if self.path != path {
            return Err(GrpcMismatch::Path {
                expected: self.path,
                actual: path.to_string(),
            });
        }
        if self.request != request_hex {
            return Err(GrpcMismatch::Request {
                expected: self.request,
                actual: request_hex.to_string(),
                path: path.to_string(),
            });
        }
        Ok(Bytes::from(self.response))
    }

    /// `path "{path}" with "{request}"`, the form used in unconsumed-queue
    /// reports.
    pub fn describe(&self) -> String {
        format!("path \"{}\" with \"{}\"", self.path, self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expectation(path: &str, request: &str, response: &str) -> GrpcExpectation {
        GrpcExpectation::from_payload(GrpcExpectationPayload {
            path: Some(path.to_string()),
            request: Some(request.to_string()),
            response: Some(response.to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_from_payload_requires_each_field() {
        let missing_path = GrpcExpectationPayload {
            path: None,
            request: Some("1111".to_string()),
            response: Some("2222".to_string()),
        };
        assert_eq!(
            GrpcExpectation::from_payload(missing_path),
            Err(ExpectationError::MissingGrpcPath)
        );

        let missing_request = GrpcExpectationPayload {
            path: Some("/test".to_string()),
            request: None,
            response: Some("2222".to_string()),
        };
        assert_eq!(
            GrpcExpectation::from_payload(missing_request),
            Err(ExpectationError::MissingGrpcRequest)
        );

        let missing_response = GrpcExpectationPayload {
            path: Some("/test".to_string()),
            request: Some("1111".to_string()),
            response: None,
        };
        assert_eq!(
            GrpcExpectation::from_payload(missing_response),
            Err(ExpectationError::MissingGrpcResponse)
        );
    }

    #[test]
    fn test_from_payload_accepts_empty_strings() {
        // Present-but-empty is valid: an empty request hex matches an empty
        // message and an empty response hex replays zero bytes.
        let exp = expectation("/test", "", "");
        assert_eq!(exp.matches("/test", "").unwrap(), Bytes::new());
    }

    #[test]
    fn test_from_payload_rejects_bad_response_hex() {
        let bad = GrpcExpectationPayload {
            path: Some("/test".to_string()),
            request: Some("1111".to_string()),
            response: Some("xyz".to_string()),
        };
        assert_eq!(
            GrpcExpectation::from_payload(bad),
            Err(ExpectationError::InvalidGrpcResponseHex)
        );
    }

    #[test]
    fn test_matches_replays_decoded_response() {
        let exp = expectation("/test", "1111", "123456");
        let reply = exp.matches("/test", "1111").unwrap();
        assert_eq!(reply, Bytes::from_static(&[0x12, 0x34, 0x56]));
    }

    #[test]
    fn test_matches_path_mismatch_message() {
        let exp = expectation("/test", "1111", "2222");
        let err = exp.matches("/other", "1111").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected path /test does not match actual /other"
        );
    }

    #[test]
    fn test_matches_request_mismatch_message() {
        let exp = expectation("/test", "1111", "2222");
        let err = exp.matches("/test", "9999").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected request 1111 does not match actual 9999 at path /test"
        );
    }

    #[test]
    fn test_path_compare_runs_before_request_compare() {
        let exp = expectation("/test", "1111", "2222");
        let err = exp.matches("/other", "9999").unwrap_err();
        assert!(matches!(err, GrpcMismatch::Path { .. }));
    }

    #[test]
    fn test_describe_format() {
        let exp = expectation("/test", "1111", "2222");
        assert_eq!(exp.describe(), "path \"/test\" with \"1111\"");
    }
}
