// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! Measures the depth of the JSON document in the request body and replies
//! with `{"levels": N}` or the fixed `{"error":"Invalid JSON"}` payload.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use json_depth::compute_depth;

use crate::{
    error::{INVALID_JSON_BODY, JSON_CONTENT_TYPE, RequestError},
    extractors::TextBody,
    state::ServerState,
    telemetry::RequestObserver,
};

/// Successful depth response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthReply {
    levels: usize,
}

impl DepthReply {
    /// Reply for a document nested `levels` deep
    pub fn new(levels: usize) -> Self {
        Self { levels }
    }

    /// Structural depth being reported
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Wire form of the reply
    pub fn body(&self) -> String {
        format!("{{\"levels\": {}}}", self.levels)
    }
}

impl IntoResponse for DepthReply {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
            self.body(),
        )
            .into_response()
    }
}

/// Depth endpoint handler
///
/// Accepts any method. An empty body is rejected without parsing; anything
/// else is handed to the depth engine. Bodies and failures are reported to
/// the state's [`RequestObserver`].
pub async fn depth_handler(
    State(state): State<ServerState>,
    body: Result<TextBody, RequestError>,
) -> Response {
    let observer = state.observer();

    match body.and_then(|TextBody(text)| measure(observer, &text)) {
        Ok(levels) => {
            let reply = DepthReply::new(levels);
            observer.response_body(&reply.body());
            reply.into_response()
        }
        Err(error) => {
            observer.rejected(&error);
            observer.response_body(INVALID_JSON_BODY);
            error.into_response()
        }
    }
}

fn measure(observer: &dyn RequestObserver, text: &str) -> Result<usize, RequestError> {
    if text.is_empty() {
        return Err(RequestError::EmptyBody);
    }

    observer.request_body(text);
    Ok(compute_depth(text)?)
}
