//! Core Session struct: expectation queues, error log, listener slot.

use super::SessionId;
use crate::expectation::{
    pretty_json, GrpcExpectation, GrpcMismatch, HttpExpectation, HttpMismatch, IncomingCall,
    MatchedResponse,
};
use crate::grpc::GrpcListenerHandle;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// One client's isolated state.
///
/// Queues and error log live behind a single sync mutex so a live call's
/// pop-then-compare runs as one atomic unit; the lock is never held across
/// an await point. The gRPC listener slot sits behind its own mutex because
/// listener lifecycle and matching never need each other.
pub struct Session {
    id: SessionId,
    state: Mutex<SessionState>,
    grpc_listener: Mutex<Option<GrpcListenerHandle>>,
}

#[derive(Default)]
struct SessionState {
    http_queue: VecDeque<HttpExpectation>,
    grpc_queue: VecDeque<GrpcExpectation>,
    errors: Vec<String>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::default()),
            grpc_listener: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Append to the HTTP expectation queue (FIFO).
    pub fn add_http_expectation(&self, expectation: HttpExpectation) {
        self.state.lock().http_queue.push_back(expectation);
    }

    /// Append to the gRPC expectation queue (FIFO).
    pub fn add_grpc_expectation(&self, expectation: GrpcExpectation) {
        self.state.lock().grpc_queue.push_back(expectation);
    }

    /// Match one live HTTP request against the front of the queue.
    ///
    /// The front expectation is consumed whether or not it matches; an empty
    /// queue or a mismatch is recorded in the error log AND returned, so the
    /// caller can relay the same message with the failure status.
    pub fn match_http_request(
        &self,
        mut call: IncomingCall,
    ) -> Result<MatchedResponse, HttpMismatch> {
        let mut state = self.state.lock();
        let Some(expectation) = state.http_queue.pop_front() else {
            let mismatch = HttpMismatch::NoExpectation {
                body: pretty_json(&call.body),
                path: call.path,
            };
            state.errors.push(mismatch.to_string());
            return Err(mismatch);
        };
        match expectation.matches(&mut call) {
            Ok(response) => Ok(response),
            Err(mismatch) => {
                state.errors.push(mismatch.to_string());
                Err(mismatch)
            }
        }
    }

    /// Match one live unary gRPC call against the front of the queue.
    ///
    /// Same consumption and logging rules as HTTP matching. The caller is
    /// expected to reply with an empty payload on `Err`.
    pub fn match_grpc_call(&self, path: &str, request_hex: &str) -> Result<Bytes, GrpcMismatch> {
        let mut state = self.state.lock();
        let Some(expectation) = state.grpc_queue.pop_front() else {
            let mismatch = GrpcMismatch::NoExpectation {
                path: path.to_string(),
                request: request_hex.to_string(),
            };
            state.errors.push(mismatch.to_string());
            return Err(mismatch);
        };
        match expectation.matches(path, request_hex) {
            Ok(reply) => Ok(reply),
            Err(mismatch) => {
                state.errors.push(mismatch.to_string());
                Err(mismatch)
            }
        }
    }

    /// Build the error list served by the inspection endpoint.
    ///
    /// Hard errors come first and verbatim. Summaries of unconsumed queues
    /// are only synthesized when the list is still empty, and an HTTP
    /// summary also suppresses the gRPC one, so the report always points at
    /// the earliest observed problem.
    pub fn error_report(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut errors = state.errors.clone();
        if errors.is_empty() && !state.http_queue.is_empty() {
            let entries: Vec<String> = state.http_queue.iter().map(|e| e.describe()).collect();
            errors.push(format!(
                "Expectation list is not empty: {}",
                entries.join(",")
            ));
        }
        if errors.is_empty() && !state.grpc_queue.is_empty() {
            let entries: Vec<String> = state.grpc_queue.iter().map(|e| e.describe()).collect();
            errors.push(format!(
                "gRPC expectations list is not empty: {}",
                entries.join(",")
            ));
        }
        errors
    }

    /// Record the listener handle after a successful gRPC enable.
    pub(crate) fn install_grpc_listener(&self, handle: GrpcListenerHandle) {
        *self.grpc_listener.lock() = Some(handle);
    }

    /// Remove and return the listener handle; `None` if gRPC was never
    /// enabled (or the handle was already taken by a concurrent teardown).
    pub(crate) fn take_grpc_listener(&self) -> Option<GrpcListenerHandle> {
        self.grpc_listener.lock().take()
    }

    /// Port of the session's live gRPC listener, if enabled.
    pub fn grpc_port(&self) -> Option<u16> {
        self.grpc_listener.lock().as_ref().map(|handle| handle.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::{GrpcExpectationPayload, HttpExpectationPayload};
    use serde_json::{json, Value};

    fn session() -> Session {
        Session::new(SessionId::parse(&"a".repeat(64)).unwrap())
    }

    fn http_expectation(raw: Value) -> HttpExpectation {
        let payload: HttpExpectationPayload = serde_json::from_value(raw).unwrap();
        HttpExpectation::from_payload(payload).unwrap()
    }

    fn grpc_expectation(path: &str, request: &str, response: &str) -> GrpcExpectation {
        GrpcExpectation::from_payload(GrpcExpectationPayload {
            path: Some(path.to_string()),
            request: Some(request.to_string()),
            response: Some(response.to_string()),
        })
        .unwrap()
    }

    fn call(method: &str, path: &str, body: Value) -> IncomingCall {
        IncomingCall {
            method: method.to_string(),
            path: path.to_string(),
            body,
            raw_body: Bytes::new(),
        }
    }

    #[test]
    fn test_http_expectations_match_in_fifo_order() {
        let session = session();
        session.add_http_expectation(http_expectation(json!({
            "path": "/first", "method": "GET", "body": {},
            "response": {"code": 201}
        })));
        session.add_http_expectation(http_expectation(json!({
            "path": "/second", "method": "GET", "body": {},
            "response": {"code": 202}
        })));

        let first = session
            .match_http_request(call("GET", "/first", json!({})))
            .unwrap();
        assert_eq!(first.code, 201);
        let second = session
            .match_http_request(call("GET", "/second", json!({})))
            .unwrap();
        assert_eq!(second.code, 202);
    }

    #[test]
    fn test_empty_queue_logs_and_reports() {
        let session = session();
        let err = session
            .match_http_request(call("GET", "/somePath", json!({"key": "value"})))
            .unwrap_err();
        let message =
            "There were no expectations for request /somePath with {\n  \"key\": \"value\"\n}";
        assert_eq!(err.to_string(), message);
        assert_eq!(session.error_report(), vec![message.to_string()]);
    }

    #[test]
    fn test_failed_match_consumes_the_expectation() {
        let session = session();
        session.add_http_expectation(http_expectation(json!({
            "path": "/expected", "method": "GET", "body": {}, "response": {}
        })));

        let first = session
            .match_http_request(call("GET", "/other", json!({})))
            .unwrap_err();
        assert!(matches!(first, HttpMismatch::Path { .. }));

        // The slot is gone: a retry of the same call hits an empty queue.
        let second = session
            .match_http_request(call("GET", "/other", json!({})))
            .unwrap_err();
        assert!(matches!(second, HttpMismatch::NoExpectation { .. }));

        assert_eq!(session.error_report().len(), 2);
    }

    #[test]
    fn test_grpc_match_consumes_and_logs() {
        let session = session();
        session.add_grpc_expectation(grpc_expectation("/test", "1111", "123456"));
        let reply = session.match_grpc_call("/test", "1111").unwrap();
        assert_eq!(reply, Bytes::from_static(&[0x12, 0x34, 0x56]));

        let err = session.match_grpc_call("/test", "1111").unwrap_err();
        assert_eq!(
            err.to_string(),
            "There were no expectations for gRPC request to /test with 1111"
        );
    }

    #[test]
    fn test_error_report_summarizes_unconsumed_http_queue() {
        let session = session();
        session.add_http_expectation(http_expectation(json!({
            "path": "/somePath", "method": "GET",
            "body": {"key": "value"}, "response": {}
        })));
        assert_eq!(
            session.error_report(),
            vec![
                "Expectation list is not empty: /somePath with {\n  \"key\": \"value\"\n}"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_error_report_joins_entries_with_comma() {
        let session = session();
        session.add_http_expectation(http_expectation(json!({
            "path": "/a", "method": "GET", "body": {}, "response": {}
        })));
        session.add_http_expectation(http_expectation(json!({
            "path": "/b", "method": "GET", "body": {}, "response": {}
        })));
        assert_eq!(
            session.error_report(),
            vec!["Expectation list is not empty: /a with {},/b with {}".to_string()]
        );
    }

    #[test]
    fn test_error_report_hard_errors_suppress_summaries() {
        let session = session();
        session.add_http_expectation(http_expectation(json!({
            "path": "/expected", "method": "GET", "body": {}, "response": {}
        })));
        session.add_http_expectation(http_expectation(json!({
            "path": "/unused", "method": "GET", "body": {}, "response": {}
        })));
        let _ = session.match_http_request(call("GET", "/other", json!({})));

        let report = session.error_report();
        assert_eq!(report.len(), 1);
        assert!(report[0].starts_with("Expected path /expected"));
    }

    #[test]
    fn test_error_report_http_summary_suppresses_grpc_summary() {
        let session = session();
        session.add_http_expectation(http_expectation(json!({
            "path": "/somePath", "method": "GET", "body": {}, "response": {}
        })));
        session.add_grpc_expectation(grpc_expectation("/test", "1111", "2222"));

        let report = session.error_report();
        assert_eq!(report.len(), 1);
        assert!(report[0].starts_with("Expectation list is not empty:"));
    }

    #[test]
    fn test_error_report_grpc_summary_format() {
        let session = session();
        session.add_grpc_expectation(grpc_expectation("/test", "1111", "2222"));
        session.add_grpc_expectation(grpc_expectation("/other", "", "00"));
        assert_eq!(
            session.error_report(),
            vec![
                "gRPC expectations list is not empty: path \"/test\" with \"1111\",path \"/other\" with \"\""
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_error_report_does_not_drain_the_log() {
        let session = session();
        let _ = session.match_http_request(call("GET", "/p", json!({})));
        assert_eq!(session.error_report().len(), 1);
        assert_eq!(session.error_report().len(), 1);
    }

    #[test]
    fn test_grpc_port_empty_until_listener_installed() {
        let session = session();
        assert_eq!(session.grpc_port(), None);
    }
}
