//! Meetup demo HTTP service.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                    MEETUP SERVER                     │
//!                         │                                                      │
//!     Client Request      │  ┌──────────┐   ┌────────────┐   ┌──────────────┐    │
//!     ────────────────────┼─▶│ listener │──▶│ request id │──▶│   observe    │    │
//!                         │  └──────────┘   └────────────┘   │  middleware  │    │
//!                         │                                  └──────┬───────┘    │
//!                         │                                         ▼            │
//!                         │                  ┌────────┬─────────┬──────────┐     │
//!                         │                  │  root  │ welcome │ external │─────┼──▶ Upstream
//!                         │                  └────────┴─────────┴──────────┘     │
//!                         │                                                      │
//!                         │  ┌────────────────────────────────────────────────┐  │
//!                         │  │  access log (JSON lines) │ spans │ /metrics    │  │
//!                         │  └────────────────────────────────────────────────┘  │
//!                         └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! meetup-server --config meetup.toml --bind 127.0.0.1:8080
//! ```

use std::path::PathBuf;

use clap::Parser;

use meetup_server::config::{self, ConfigError, ServiceConfig};
use meetup_server::lifecycle::startup;
use meetup_server::observability::init_logging;

#[derive(Parser)]
#[command(name = "meetup-server")]
#[command(about = "Demo HTTP service with structured logging, tracing and metrics", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(cli: &Cli) -> Result<ServiceConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServiceConfig::default(),
    };

    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        config::validate_config(&config).map_err(ConfigError::Validation)?;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        request_timeout_secs = config.timeouts.request_secs,
        "meetup-server starting"
    );

    startup::run(config).await?;
    Ok(())
}
