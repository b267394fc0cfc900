//! Queued expectations and the matching rules applied to live traffic.

pub mod field_path;
pub mod grpc;
pub mod http;

pub use field_path::{FieldPath, InvalidAccessor};
pub use grpc::{GrpcExpectation, GrpcExpectationPayload, GrpcMismatch};
pub use http::{
    lenient_json_body, HttpExpectation, HttpExpectationPayload, HttpMismatch, IncomingCall,
    MatchedResponse,
};

use serde_json::Value;

/// Validation error for an expectation registration payload.
///
/// `Display` is the exact message returned to the configuring client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpectationError {
    #[error("Missing required fields")]
    MissingRequiredFields,
    #[error("Invalid body type")]
    InvalidBodyType,
    #[error("Invalid response code")]
    InvalidResponseCode,
    #[error(transparent)]
    Accessor(#[from] InvalidAccessor),
    #[error("Missing expected gRPC path")]
    MissingGrpcPath,
    #[error("Missing expected gRPC request")]
    MissingGrpcRequest,
    #[error("Missing target gRPC response")]
    MissingGrpcResponse,
    #[error("Invalid gRPC response hex")]
    InvalidGrpcResponseHex,
}

/// 2-space pretty print, the format used in every logged message.
pub(crate) fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
