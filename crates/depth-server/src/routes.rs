// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! The server has a single operation, so every method and path reaching the
//! router is handled by [`handlers::depth_handler`]. Listener prefixes are
//! enforced by middleware before the handler runs.

pub mod handlers;

use axum::Router;
use handlers::depth_handler;

use crate::state::ServerState;

/// Create application routes
pub fn create_routes() -> Router<ServerState> {
    Router::new().fallback(depth_handler)
}
