// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct for the depth server: binding
//! every configured listener, serving them concurrently, and coordinated
//! graceful shutdown using `CancellationToken`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, body::Body, middleware};
use tokio::{net::TcpListener, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    middleware::{
        ListenPrefixes, REQUEST_ID_HEADER, handle_panic, make_request_span,
        prefix_filter_middleware,
    },
    routes::create_routes,
    state::ServerState,
    telemetry::{RequestObserver, TracingObserver},
};

const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for listeners to drain before aborting them
    pub graceful_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

/// A bound socket and the prefixes it serves
#[derive(Debug)]
struct BoundListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    prefixes: ListenPrefixes,
}

type ServeTasks = JoinSet<(SocketAddr, std::io::Result<()>)>;

/// Main server struct
#[derive(Debug)]
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Server state
    state: ServerState,
    /// Cancellation token for coordinated shutdown
    cancellation_token: CancellationToken,
    /// Configuration for coordinated shutdown
    shutdown_config: ShutdownConfig,
}

impl Server {
    /// Create new server instance logging through `tracing`
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn new(config: ServerConfig, shutdown_config: ShutdownConfig) -> ServerResult<Self> {
        Self::with_observer(config, shutdown_config, Arc::new(TracingObserver))
    }

    /// Create server with a custom request observer for dependency injection
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn with_observer(
        config: ServerConfig,
        shutdown_config: ShutdownConfig,
        observer: Arc<dyn RequestObserver>,
    ) -> ServerResult<Self> {
        config.validate().map_err(|e| ServerError::Config {
            message: format!("invalid configuration: {e}"),
        })?;

        let cancellation_token = CancellationToken::new();
        let state = ServerState::new(config.clone(), observer, cancellation_token.child_token());

        Ok(Self {
            config,
            state,
            cancellation_token,
            shutdown_config,
        })
    }

    /// Create the router for one listener with middleware
    fn create_router(&self, prefixes: ListenPrefixes) -> Router {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(CatchPanicLayer::custom(handle_panic));

        create_routes()
            .layer(middleware::from_fn_with_state(
                prefixes,
                prefix_filter_middleware,
            ))
            .layer(layers)
            .with_state(self.state.clone())
    }

    /// Group the configured URIs by bind address, keeping configuration order
    fn listener_groups(&self) -> Vec<(String, Vec<String>)> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();

        for uri in &self.config.listen {
            let address = uri.bind_address();
            let prefix = uri.prefix().to_string();
            match groups.iter_mut().find(|(bound, _)| *bound == address) {
                Some((_, prefixes)) => prefixes.push(prefix),
                None => groups.push((address, vec![prefix])),
            }
        }

        groups
    }

    /// Bind every listener, failing before anything is served
    async fn bind_all(&self) -> ServerResult<Vec<BoundListener>> {
        let mut bound = Vec::new();

        for (address, prefixes) in self.listener_groups() {
            let listener = TcpListener::bind(address.as_str())
                .await
                .map_err(|source| {
                    error!(%address, error = %source, "failed to bind listener");
                    ServerError::Bind {
                        address: address.clone(),
                        source,
                    }
                })?;

            let local_addr = listener
                .local_addr()
                .map_err(|source| ServerError::Startup { source })?;

            bound.push(BoundListener {
                listener,
                local_addr,
                prefixes: ListenPrefixes::new(prefixes),
            });
        }

        Ok(bound)
    }

    /// Spawn one serve task per listener
    fn spawn_listeners(&self, listeners: Vec<BoundListener>) -> ServeTasks {
        let mut tasks = JoinSet::new();

        for bound in listeners {
            info!(
                address = %bound.local_addr,
                prefixes = %bound.prefixes,
                environment = %self.config.environment,
                "depth server listening",
            );

            let router = self.create_router(bound.prefixes);
            let token = self.cancellation_token.clone();
            let local_addr = bound.local_addr;
            tasks.spawn(async move {
                let result = axum::serve(bound.listener, router)
                    .with_graceful_shutdown(token.cancelled_owned())
                    .await;
                (local_addr, result)
            });
        }

        tasks
    }

    /// Wait for the serve tasks, stopping all of them when one fails
    ///
    /// Once shutdown starts, listeners get `graceful_timeout` to drain before
    /// they are aborted.
    async fn supervise(&self, mut tasks: ServeTasks) -> ServerResult<()> {
        let graceful_timeout = self.shutdown_config.graceful_timeout;
        let token = self.cancellation_token.clone();
        let drain_deadline = async move {
            token.cancelled().await;
            tokio::time::sleep(graceful_timeout).await;
        };
        tokio::pin!(drain_deadline);

        let mut outcome = Ok(());
        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    let Some(joined) = joined else {
                        break;
                    };

                    let failure = match joined {
                        Ok((_, Ok(()))) => None,
                        Ok((address, Err(source))) => {
                            error!(%address, error = %source, "listener stopped serving");
                            Some(ServerError::Serve {
                                address: address.to_string(),
                                source,
                            })
                        }
                        Err(source) => {
                            error!(error = %source, "listener task failed");
                            Some(ServerError::from(source))
                        }
                    };

                    if let Some(failure) = failure {
                        self.cancellation_token.cancel();
                        if outcome.is_ok() {
                            outcome = Err(failure);
                        }
                    }
                }
                () = &mut drain_deadline => {
                    warn!(
                        timeout_seconds = graceful_timeout.as_secs(),
                        remaining = tasks.len(),
                        "graceful shutdown timed out, aborting listeners"
                    );
                    tasks.shutdown().await;
                    break;
                }
            }
        }

        outcome
    }

    /// Run the server with coordinated graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if any configured address cannot be bound,
    /// in which case nothing is served, or `ServerError::Serve` if a listener
    /// fails while serving.
    pub async fn run(self) -> ServerResult<()> {
        let listeners = self.bind_all().await?;

        let shutdown_token = self.cancellation_token.clone();
        tokio::spawn(async move {
            info!("spawning the graceful shutdown task");
            Self::shutdown_signal_handler(shutdown_token).await;
        });

        let tasks = self.spawn_listeners(listeners);
        let result = self.supervise(tasks).await;
        info!("depth server shut down");
        result
    }

    /// Handle shutdown signals and trigger coordinated cancellation
    ///
    /// This function listens for SIGINT (Ctrl+C) and SIGTERM signals,
    /// and cancels the provided cancellation token when received.
    async fn shutdown_signal_handler(cancellation_token: CancellationToken) {
        let signal_received = async {
            #[cfg(unix)]
            #[allow(clippy::expect_used)]
            {
                use tokio::signal::unix::{SignalKind, signal};

                let mut sigterm =
                    signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
                let mut sigint =
                    signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                }
            }

            #[cfg(not(unix))]
            #[allow(clippy::expect_used)]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install CTRL+C signal handler");
                "CTRL+C"
            }
        };

        // Wait for either a signal or existing cancellation
        tokio::select! {
            signal_name = signal_received => {
                warn!("Shutdown signal {} received, stopping all listeners...", signal_name);
                cancellation_token.cancel();
            },
            () = cancellation_token.cancelled() => {
                info!("Cancellation token already cancelled, shutdown signal handler exiting");
            }
        }
    }

    /// Returns a clone of the cancellation token for coordinated shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Initiates graceful shutdown by cancelling the server's cancellation token
    pub fn shutdown(&self) {
        info!("programmatic shutdown requested");
        self.cancellation_token.cancel();
    }

    /// Run server for testing, returns the bound addresses
    ///
    /// Cancelling the returned token stops every listener.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to a configured address.
    pub async fn run_for_testing(self) -> ServerResult<(Vec<SocketAddr>, CancellationToken)> {
        let listeners = self.bind_all().await?;
        let addresses = listeners.iter().map(|bound| bound.local_addr).collect();
        let token = self.cancellation_token.clone();

        let tasks = self.spawn_listeners(listeners);
        tokio::spawn(async move {
            if let Err(e) = self.supervise(tasks).await {
                error!(error = %e, "test server failed");
            }
        });

        Ok((addresses, token))
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server state for testing
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, ListenUri};

    fn testing_config(uris: &[&str]) -> ServerConfig {
        let listen = uris
            .iter()
            .map(|uri| ListenUri::parse(uri).unwrap())
            .collect();
        ServerConfig::for_testing().with_listen(listen).unwrap()
    }

    #[tokio::test]
    async fn server_creation() -> ServerResult<()> {
        let config = ServerConfig::for_testing();
        let server = Server::new(config, ShutdownConfig::default())?;
        assert_eq!(server.config().environment, Environment::Testing);
        assert!(!server.cancellation_token().is_cancelled());
        assert!(!server.state().cancellation_token.is_cancelled());
        Ok(())
    }

    #[tokio::test]
    async fn programmatic_shutdown() -> ServerResult<()> {
        let config = ServerConfig::for_testing();
        let server = Server::new(config, ShutdownConfig::default())?;

        assert!(!server.cancellation_token().is_cancelled());

        server.shutdown();

        assert!(server.cancellation_token().is_cancelled());
        assert!(server.state().cancellation_token.is_cancelled());
        Ok(())
    }

    #[test]
    fn shutdown_config_default() {
        let config = ShutdownConfig::default();
        assert_eq!(
            config.graceful_timeout,
            Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS)
        );
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut config = ServerConfig::for_testing();
        config.listen.clear();
        assert!(matches!(
            Server::new(config, ShutdownConfig::default()),
            Err(ServerError::Config { .. })
        ));
    }

    #[test]
    fn listeners_sharing_an_address_are_grouped() -> ServerResult<()> {
        let config = testing_config(&[
            "http://127.0.0.1:0/a/",
            "http://127.0.0.1:0/b/",
            "http://[::1]:0/",
        ]);
        let server = Server::new(config, ShutdownConfig::default())?;

        let groups = server.listener_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "127.0.0.1:0");
        assert_eq!(groups[0].1, vec!["/a/".to_string(), "/b/".to_string()]);
        assert_eq!(groups[1].0, "[::1]:0");
        Ok(())
    }

    #[tokio::test]
    async fn bind_failure_is_reported() -> ServerResult<()> {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let config = testing_config(&[&format!("http://127.0.0.1:{port}/")]);
        let server = Server::new(config, ShutdownConfig::default())?;

        let result = server.run_for_testing().await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn run_returns_after_shutdown() -> ServerResult<()> {
        let server = Server::new(ServerConfig::for_testing(), ShutdownConfig::default())?;
        let token = server.cancellation_token();

        let handle = tokio::spawn(server.run());
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server did not stop in time")?;
        assert!(result.is_ok());
        Ok(())
    }
}
