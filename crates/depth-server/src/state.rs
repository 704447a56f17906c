// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! This module provides shared application state for the depth server: the
//! configuration, the injected request observer, and the cancellation token
//! used for coordinated shutdown.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{config::ServerConfig, telemetry::RequestObserver};

/// Shared application state with cancellation token support
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: Arc<ServerConfig>,
    /// Sink for request and response logging
    observer: Arc<dyn RequestObserver>,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

impl ServerState {
    /// Create new server state
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `observer` - Receives request bodies, response bodies and failures
    /// * `cancellation_token` - Token for coordinated cancellation
    pub fn new(
        config: ServerConfig,
        observer: Arc<dyn RequestObserver>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            observer,
            cancellation_token,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Request observer handlers report to
    pub fn observer(&self) -> &dyn RequestObserver {
        self.observer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TracingObserver;

    #[test]
    fn server_state_creation() {
        let config = ServerConfig::for_testing();
        let state = ServerState::new(config, Arc::new(TracingObserver), CancellationToken::new());

        assert!(!state.cancellation_token.is_cancelled());
        assert_eq!(state.config().listen.len(), 1);
    }

    #[test]
    fn server_state_with_cancellation_token() {
        let config = ServerConfig::for_testing();
        let token = CancellationToken::new();
        let state = ServerState::new(config, Arc::new(TracingObserver), token.clone());

        assert!(!state.cancellation_token.is_cancelled());

        // Test that the tokens are linked
        token.cancel();
        assert!(state.cancellation_token.is_cancelled());
    }
}
