//! guard-server: request admission and observability edge service

use adele_guard::monitoring::logger::LogLevel;
use adele_guard::utils::logging::init_tracing;
use adele_guard::{Config, HttpServer};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config/guard.yaml";

#[derive(Debug, Parser)]
#[command(name = "guard-server", version, about)]
struct Args {
    /// YAML configuration file. Defaults to config/guard.yaml when present,
    /// otherwise configuration comes from the environment.
    #[arg(short, long, env = "GUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the minimum log level (debug, info, warn, error, fatal)
    #[arg(long)]
    log_level: Option<LogLevel>,
}

async fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None if tokio::fs::try_exists(DEFAULT_CONFIG_PATH).await.unwrap_or(false) => {
            Config::from_file(DEFAULT_CONFIG_PATH)
                .await
                .with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))?
        }
        None => Config::from_env().context("loading configuration from environment")?,
    };

    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.observability.logger.min_level = level;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args).await?;
    init_tracing(
        config.observability.logger.min_level,
        config.observability.logger.json,
    )?;

    info!(
        version = adele_guard::VERSION,
        bind = %config.server.bind_addr(),
        strategy = ?config.rate_limit.strategy,
        "Starting guard server"
    );

    HttpServer::new(&config).await?.start().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
