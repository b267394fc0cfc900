//! Route dispatch for the configuration API and live-traffic interception.
//!
//! Configuration endpoints are matched exactly; anything else is checked
//! against the `/{64-char-session-id}{/path}` interception shape before
//! falling through to 404.

use crate::api::handlers::{errors, expectation, intercept, session, system};
use crate::api::types::not_found;
use crate::session::{SessionId, SessionRegistry, SESSION_ID_LEN};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::sync::Arc;
use tracing::debug;

/// A live-traffic target parsed from the request path.
pub(crate) struct InterceptTarget {
    pub session_id: SessionId,
    /// Session-relative remainder: query string kept, at most one trailing
    /// `/` stripped, `/` when empty.
    pub path: String,
}

impl InterceptTarget {
    fn parse(path: &str, query: Option<&str>) -> Option<Self> {
        let rest = path.strip_prefix('/')?;
        if !rest.is_char_boundary(SESSION_ID_LEN) {
            return None;
        }
        let bytes = rest.as_bytes();
        if bytes.len() > SESSION_ID_LEN && bytes[SESSION_ID_LEN] != b'/' {
            return None;
        }
        let session_id = SessionId::parse(&rest[..SESSION_ID_LEN]).ok()?;

        let mut remainder = rest[SESSION_ID_LEN..].to_string();
        if let Some(query) = query {
            remainder.push('?');
            remainder.push_str(query);
        }
        Some(Self {
            session_id,
            path: normalize_remainder(&remainder),
        })
    }
}

fn normalize_remainder(remainder: &str) -> String {
    let trimmed = remainder.strip_suffix('/').unwrap_or(remainder);
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    registry: Arc<SessionRegistry>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());

    debug!("API: {} {}", method, path);

    let response = route_by_path(&method, &path, query.as_deref(), req, registry).await;
    Ok(response)
}

/// Route based on path
async fn route_by_path(
    method: &Method,
    path: &str,
    query: Option<&str>,
    req: Request<Incoming>,
    registry: Arc<SessionRegistry>,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::POST, "/session") => return session::handle_create(req, registry).await,
        (&Method::PUT, "/expectation") => return expectation::handle_add_http(req, registry).await,
        (&Method::PUT, "/expectation/grpc") => {
            return expectation::handle_add_grpc(req, registry).await
        }
        (&Method::POST, "/grpc/enable") => return session::handle_enable_grpc(req, registry).await,
        (&Method::GET, "/errors") => return errors::handle_get(query, registry).await,
        (&Method::DELETE, "/flush") => return session::handle_flush(registry).await,
        (&Method::GET, "/health") => return system::handle_health(),
        _ => {}
    }

    // Anything with a session-id prefix is live traffic, whatever the method.
    if let Some(target) = InterceptTarget::parse(path, query) {
        return intercept::handle(target, req, registry).await;
    }

    not_found()
}
