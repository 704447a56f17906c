// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! JSON Depth Server
//!
//! Replies to every request with the nesting depth of the JSON body.

use anyhow::Result;
use clap::Parser;
use depth_server::{Server, ShutdownConfig, cli::Cli, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    telemetry::init(&config.log)?;

    info!(
        listen = ?config.listen.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "Starting JSON depth server"
    );

    let server = Server::new(config, ShutdownConfig::default())?;

    // NOTE: the `#[tokio::main]` task does not run a worker future, we must spawn
    if let Err(e) = tokio::spawn(async move { server.run().await }).await? {
        error!(error = %e, "JSON depth server failed");
        return Err(e.into());
    }

    Ok(())
}
