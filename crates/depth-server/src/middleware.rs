// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Middleware module for HTTP request processing
//!
//! This module provides the listener prefix filter, request tracing spans and
//! panic handling for the depth server.

use std::{any::Any, fmt, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{HeaderName, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{Span, debug, error, info_span};

use crate::error::{INVALID_JSON_BODY, JSON_CONTENT_TYPE};

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Path prefixes served by one listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenPrefixes(Arc<[String]>);

impl ListenPrefixes {
    /// Create a prefix set; each prefix is expected to end with `/`
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        let mut prefixes: Vec<String> = prefixes.into_iter().collect();
        prefixes.sort();
        prefixes.dedup();
        Self(prefixes.into())
    }

    /// Whether `path` falls under one of the prefixes
    ///
    /// A prefix matches itself, itself without the trailing slash, and every
    /// path below it.
    pub fn accepts(&self, path: &str) -> bool {
        self.0
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()) || path == prefix.trim_end_matches('/'))
    }
}

impl fmt::Display for ListenPrefixes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Reject requests whose path is outside the listener's prefixes
pub async fn prefix_filter_middleware(
    State(prefixes): State<ListenPrefixes>,
    req: Request,
    next: Next,
) -> Response {
    if prefixes.accepts(req.uri().path()) {
        return next.run(req).await;
    }

    debug!(
        path = req.uri().path(),
        prefixes = %prefixes,
        "no listener prefix matches request path"
    );
    StatusCode::NOT_FOUND.into_response()
}

/// Tracing span for a request, tagged with its request id
pub fn make_request_span<B>(req: &hyper::Request<B>) -> Span {
    info_span!(
        "http_request",
        request_id = request_id(req),
        method = %req.method(),
        path = req.uri().path()
    )
}

/// The request id set by `SetRequestIdLayer`, or `unknown` outside that layer
fn request_id<B>(req: &hyper::Request<B>) -> &str {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
}

/// Turn a handler panic into a 500 response so the connection survives
#[allow(clippy::needless_pass_by_value)] // signature required by `CatchPanicLayer::custom`
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(panic = detail, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
        INVALID_JSON_BODY,
    )
        .into_response()
}
