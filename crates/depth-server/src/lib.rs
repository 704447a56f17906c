// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! JSON Depth Server Implementation
//!
//! This crate provides the HTTP server that reports the nesting depth of JSON
//! documents, built with Axum on top of the [`json_depth`] engine.
//!
//! # Module Structure
//!
//! - [`cli`]: Command line arguments and their effect on configuration
//! - [`config`]: Listener, limit and logging configuration with hierarchical loading
//! - [`error`]: Server lifecycle errors and the per-request error payload
//! - [`extractors`]: Request body reading and charset decoding
//! - [`middleware`]: Listener prefix filtering, request spans and panic handling
//! - [`routes`]: The depth handler
//! - [`server`]: Listener binding, serving and coordinated shutdown
//! - [`state`]: Shared application state
//! - [`telemetry`]: Log subscriber setup and the injected request observer
//!
//! # Wire Contract
//!
//! Any method on any path under a configured prefix is answered with
//! `Content-Type: application/json` and either `{"levels": N}` or
//! `{"error":"Invalid JSON"}`.

pub mod cli;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::{Environment, ListenUri, ServerConfig};
pub use error::{RequestError, ServerError, ServerResult};
pub use server::{Server, ShutdownConfig};
pub use state::ServerState;
pub use telemetry::{RequestObserver, TracingObserver};
