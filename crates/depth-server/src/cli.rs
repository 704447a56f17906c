// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Command line interface

use std::path::PathBuf;

use clap::Parser;

use crate::{
    config::{ListenUri, ServerConfig},
    error::ServerResult,
};

/// Command line arguments of the `depth-server` binary
#[derive(Parser, Debug)]
#[command(name = "depth-server", version)]
#[command(about = "Serve the nesting depth of JSON documents over HTTP")]
pub struct Cli {
    /// Configuration file layered over config.json and below environment variables.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Listen URIs such as http://127.0.0.1:8080/, replacing the configured ones.
    #[arg(value_name = "URI", value_parser = parse_listen_uri)]
    pub listen: Vec<ListenUri>,
}

fn parse_listen_uri(raw: &str) -> Result<ListenUri, String> {
    ListenUri::parse(raw).map_err(|e| format!("{e:#}"))
}

impl Cli {
    /// Load the configuration, then apply listen URIs given on the command line
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if loading or validation fails.
    pub fn load_config(&self) -> ServerResult<ServerConfig> {
        let config = ServerConfig::from_env(self.config.as_deref())?;
        if self.listen.is_empty() {
            return Ok(config);
        }
        config.with_listen(self.listen.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uris_and_config() {
        let cli = Cli::try_parse_from([
            "depth-server",
            "http://127.0.0.1:9000/",
            "--config",
            "depth.json",
            "http://localhost:9001/api/",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("depth.json")));
        assert_eq!(cli.listen.len(), 2);
        assert_eq!(cli.listen[0].port(), 9000);
        assert_eq!(cli.listen[1].prefix(), "/api/");
    }

    #[test]
    fn no_arguments() {
        let cli = Cli::try_parse_from(["depth-server"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.listen.is_empty());
    }

    #[test]
    fn rejects_invalid_uri() {
        assert!(Cli::try_parse_from(["depth-server", "https://127.0.0.1/"]).is_err());
        assert!(Cli::try_parse_from(["depth-server", "127.0.0.1:8080"]).is_err());
    }
}
