// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! Two families of errors live here. [`ServerError`] covers the process:
//! configuration, binding, serving. [`RequestError`] covers a single request
//! and always renders as the fixed `{"error":"Invalid JSON"}` payload, so
//! parser internals never reach the client.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use json_depth::ParseError;
use thiserror::Error;

/// Body returned for every request that does not yield a depth
pub const INVALID_JSON_BODY: &str = r#"{"error":"Invalid JSON"}"#;

/// Content type of every depth response
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Error types for server lifecycle operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// `host:port` that failed to bind
        address: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// A listener stopped serving because of an IO error
    #[error("Serving on {address} failed: {source}")]
    Serve {
        /// Local address of the failed listener
        address: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Task join errors for async operations
    #[error("Task join error: {source}")]
    TaskJoin {
        /// Underlying tokio join error
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl From<tokio::task::JoinError> for ServerError {
    fn from(source: tokio::task::JoinError) -> Self {
        Self::TaskJoin { source }
    }
}

/// Reasons a single request produced no depth
#[derive(Error, Debug)]
pub enum RequestError {
    /// No request content was supplied
    #[error("no client data was sent with the request")]
    EmptyBody,

    /// The body is not a valid JSON document
    #[error("invalid JSON document: {0}")]
    Parse(#[from] ParseError),

    /// The body could not be read from the connection
    #[error("failed to read request body: {message}")]
    Transport {
        /// Error message
        message: String,
    },
}

impl RequestError {
    /// HTTP status sent alongside the fixed error payload
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyBody | Self::Parse(_) | Self::Transport { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
            INVALID_JSON_BODY,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn request_errors_hide_details() {
        let parse = json_depth::compute_depth("{\"secret\": ").unwrap_err();
        let errors = [
            RequestError::EmptyBody,
            RequestError::Parse(parse),
            RequestError::Transport {
                message: "connection reset".to_string(),
            },
        ];

        for error in errors {
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                response.headers().get(header::CONTENT_TYPE).unwrap(),
                JSON_CONTENT_TYPE
            );

            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], INVALID_JSON_BODY.as_bytes());
        }
    }

    #[test]
    fn server_error_messages() {
        let error = ServerError::Bind {
            address: "127.0.0.1:80".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(error.to_string().starts_with("Failed to bind to 127.0.0.1:80"));

        let error = ServerError::Config {
            message: "bad".to_string(),
        };
        assert_eq!(error.to_string(), "Configuration error: bad");
    }
}
