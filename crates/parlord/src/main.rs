//! # parlord
//!
//! Parlor session server binary — loads configuration, wires the rule
//! engine into the server, and runs until interrupted.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use parlor_rules::TicTacToe;
use parlor_server::config::{ServerConfig, apply_env_overrides, load_config_from_path};
use parlor_server::server::ParlorServer;
use parlor_session::MovePolicy;

/// Parlor session server.
#[derive(Parser, Debug)]
#[command(name = "parlord", about = "Parlor session server")]
struct Cli {
    /// Host to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Move policing: "compat" or "strict" (overrides config).
    #[arg(long)]
    move_policy: Option<String>,
}

/// Parse a `--move-policy` value through the same serde names the config
/// file uses.
fn parse_policy(raw: &str) -> Result<MovePolicy> {
    serde_json::from_value(serde_json::Value::String(raw.to_owned())).with_context(|| {
        format!("invalid move policy {raw:?} (expected \"compat\" or \"strict\")")
    })
}

fn resolve_config(args: &Cli) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let mut config = ServerConfig::default();
            apply_env_overrides(&mut config);
            config
        }
    };

    // CLI flags win over file and environment.
    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(policy) = &args.move_policy {
        config.move_policy = parse_policy(policy)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = resolve_config(&args)?;

    let server = ParlorServer::new(config, Arc::new(TicTacToe));
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;

    tracing::info!("parlor listening on http://{addr}");

    // Block until ctrl-c
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.shutdown().shutdown();
    let _ = handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_defaults_are_unset() {
        let cli = Cli::parse_from(["parlord"]);
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.config.is_none());
        assert!(cli.move_policy.is_none());
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from([
            "parlord",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--move-policy",
            "compat",
        ]);
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.move_policy.as_deref(), Some("compat"));
    }

    #[test]
    fn parse_policy_accepts_both_modes() {
        assert_eq!(parse_policy("compat").unwrap(), MovePolicy::Compat);
        assert_eq!(parse_policy("strict").unwrap(), MovePolicy::Strict);
    }

    #[test]
    fn parse_policy_rejects_unknown() {
        assert!(parse_policy("casual").is_err());
    }

    #[test]
    fn resolve_config_applies_cli_overrides() {
        let cli = Cli::parse_from(["parlord", "--port", "0", "--move-policy", "compat"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.port, 0);
        assert_eq!(config.move_policy, MovePolicy::Compat);
        assert_eq!(config.host, ServerConfig::default().host);
    }

    #[test]
    fn resolve_config_cli_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 4000, "host": "10.0.0.1"}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_owned();

        let cli = Cli::parse_from(["parlord", "--config", &path, "--port", "5000"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "10.0.0.1");
    }

    #[test]
    fn resolve_config_reports_bad_policy() {
        let cli = Cli::parse_from(["parlord", "--move-policy", "casual"]);
        assert!(resolve_config(&cli).is_err());
    }
}
