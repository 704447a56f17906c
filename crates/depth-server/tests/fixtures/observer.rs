// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0
#![allow(dead_code)]

//! Recording observer and server startup helpers

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use depth_server::{
    ListenUri, RequestError, RequestObserver, Server, ServerConfig, ShutdownConfig,
};
use tokio_util::sync::CancellationToken;

/// Something the server reported while handling a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    /// A non-empty request body
    Request(String),
    /// A response body
    Response(String),
    /// A rejection, by kind
    Rejected(Rejection),
}

/// Kind of rejection reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Empty body
    Empty,
    /// Parse failure
    Parse,
    /// Body could not be read
    Transport,
}

/// Observer that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    /// Events recorded so far, oldest first
    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: Observed) {
        self.events.lock().unwrap().push(event);
    }
}

impl RequestObserver for RecordingObserver {
    fn request_body(&self, body: &str) {
        self.record(Observed::Request(body.to_string()));
    }

    fn response_body(&self, body: &str) {
        self.record(Observed::Response(body.to_string()));
    }

    fn rejected(&self, error: &RequestError) {
        let kind = match error {
            RequestError::EmptyBody => Rejection::Empty,
            RequestError::Parse(_) => Rejection::Parse,
            RequestError::Transport { .. } => Rejection::Transport,
        };
        self.record(Observed::Rejected(kind));
    }
}

/// A running test server
pub struct TestServer {
    /// Bound addresses, one per distinct listener
    pub addresses: Vec<SocketAddr>,
    /// Events reported by the handler
    pub observer: Arc<RecordingObserver>,
    /// Stops the server
    pub token: CancellationToken,
}

impl TestServer {
    /// Start a server with the testing configuration
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::for_testing()).await
    }

    /// Start a server listening on `uris`
    pub async fn start_on(uris: &[&str]) -> Self {
        let listen = uris
            .iter()
            .map(|uri| ListenUri::parse(uri).expect("valid listen URI"))
            .collect();
        let config = ServerConfig::for_testing()
            .with_listen(listen)
            .expect("valid listen configuration");
        Self::start_with(config).await
    }

    /// Start a server with a custom configuration
    pub async fn start_with(config: ServerConfig) -> Self {
        let observer = Arc::new(RecordingObserver::default());
        let (addresses, token) =
            Server::with_observer(config, ShutdownConfig::default(), observer.clone())
                .expect("Failed to create server")
                .run_for_testing()
                .await
                .expect("Failed to start test server");

        Self {
            addresses,
            observer,
            token,
        }
    }

    /// URL of `path` on the first listener
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addresses[0])
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
