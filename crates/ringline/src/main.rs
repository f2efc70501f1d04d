// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ringline - real-time call signaling server.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ringline_config::{ConfigError, RinglineConfig};

/// Ringline - real-time call signaling server.
#[derive(Parser, Debug)]
#[command(name = "ringline", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the signaling server.
    Serve,
    /// Validate the configuration and print the effective settings.
    Check,
}

fn load_config(path: Option<&PathBuf>) -> Result<RinglineConfig, Vec<ConfigError>> {
    match path {
        Some(path) => ringline_config::load_and_validate_path(path),
        None => ringline_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            ringline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("ringline: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Check) => {
            println!(
                "ringline: config ok (listen={}:{}, database={}, ring_timeout={}s, auth={})",
                config.server.host,
                config.server.port,
                config.storage.database_path,
                config.calls.ring_timeout_secs,
                if config.server.bearer_token.is_some() {
                    "bearer"
                } else {
                    "none, all requests rejected"
                }
            );
        }
        None => {
            println!("ringline: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_global_config_flag() {
        let cli = Cli::try_parse_from(["ringline", "serve", "--config", "/tmp/r.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/r.toml")));
    }

    #[test]
    #[serial_test::serial]
    fn explicit_config_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ringline.toml");
        std::fs::write(&path, "[server]\nport = 9911\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9911);
    }

    #[test]
    #[serial_test::serial]
    fn invalid_config_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ringline.toml");
        std::fs::write(&path, "[server]\nprot = 1\n").unwrap();
        let errors = load_config(Some(&path)).unwrap_err();
        assert!(!errors.is_empty());
    }
}
