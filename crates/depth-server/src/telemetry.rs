// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Logging collaborators
//!
//! [`init`] installs the console subscriber once at process start.
//! [`RequestObserver`] is what request handlers log through; it is handed to
//! the server explicitly so tests and embedders can substitute their own.

use std::fmt;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::LogConfig,
    error::{RequestError, ServerError, ServerResult},
};

/// Receives the observable events of a depth request
pub trait RequestObserver: Send + Sync + fmt::Debug {
    /// Raw text of a non-empty request body, before parsing
    fn request_body(&self, body: &str);

    /// Raw response body about to be sent
    fn response_body(&self, body: &str);

    /// Why a request produced no depth
    fn rejected(&self, error: &RequestError);
}

/// Observer that emits `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn request_body(&self, body: &str) {
        info!(body, "json request");
    }

    fn response_body(&self, body: &str) {
        info!(body, "json response");
    }

    fn rejected(&self, error: &RequestError) {
        match error {
            RequestError::EmptyBody => warn!("no client data was sent with the request"),
            RequestError::Parse(parse) => warn!(
                line = parse.line(),
                column = parse.column(),
                hint = parse.hint(),
                error = %parse,
                "rejecting invalid JSON document"
            ),
            RequestError::Transport { message } => {
                error!(error = %message, "failed to read request body");
            }
        }
    }
}

/// Install the global console subscriber
///
/// `RUST_LOG` takes precedence over the configured filter.
///
/// # Errors
///
/// Returns `ServerError::Config` if the filter is invalid or a subscriber is
/// already installed.
pub fn init(log: &LogConfig) -> ServerResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.filter).map_err(|e| ServerError::Config {
            message: format!("invalid log filter '{}': {e}", log.filter),
        })?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(log.ansi))
        .try_init()
        .map_err(|e| ServerError::Config {
            message: format!("failed to install log subscriber: {e}"),
        })
}
