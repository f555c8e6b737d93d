//! Demo server for the request log middleware.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --listen 127.0.0.1:3000 --log-format json
//! ```
//!
//! Settings not given on the command line come from the environment
//! (a `.env` file is loaded first); see [`request_log::config`].

use request_log::config::{Config, ServerConfig};
use request_log::params::MaskRules;
use request_log::server;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Serves a small router with the request log attached.
#[derive(Parser)]
#[command(name = "request-log-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Bind address, overrides `LISTEN`
    #[arg(long)]
    listen: Option<String>,

    /// Log format (`text` or `json`), overrides `LOG_FORMAT`
    #[arg(long)]
    log_format: Option<String>,

    /// Parameters to mask, overrides `REQUEST_LOG_MASK_PARAMS`
    #[arg(long)]
    mask_params: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut server_config = ServerConfig::from_env();
    let mut log_config = Config::from_env();
    apply_overrides(&cli, &mut server_config, &mut log_config);

    server_config.validate()?;
    log_config
        .validate()
        .context("Invalid request log configuration")?;

    init_tracing(&server_config)?;
    log_config.print_summary();

    server::run(server_config, log_config).await
}

fn apply_overrides(cli: &Cli, server: &mut ServerConfig, log: &mut Config) {
    if let Some(listen) = &cli.listen {
        server.listen_addr = listen.clone();
    }
    if let Some(format) = &cli.log_format {
        server.log_format = format.clone();
    }
    if let Some(mask) = cli.mask_params.as_deref().filter(|m| !m.trim().is_empty()) {
        log.mask_rules = MaskRules::parse(mask);
    }
}

fn init_tracing(server: &ServerConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&server.log_level)?;

    if server.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}
