//! viadro-api: document hosting server.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use viadro_api::domain::ServerConfig;
use viadro_api::ViadroService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// Document hosting API server
#[derive(Parser, Debug)]
#[command(name = "viadro-api")]
#[command(about = "Upload, share and browse documents over a JSON API")]
struct Args {
    /// HTTP port
    #[arg(long, default_value_t = 4000)]
    port: u16,

    /// Environment name (development|staging|production)
    #[arg(long, default_value = "development")]
    env: String,

    /// Directory for uploaded objects. Omit with --in-memory-storage
    #[arg(long, default_value = "./uploads")]
    storage_dir: PathBuf,

    /// Keep uploaded objects in memory
    #[arg(long)]
    in_memory_storage: bool,

    /// Base URL document links are built from
    #[arg(long, default_value = "http://localhost:4000/files")]
    public_base_url: String,

    /// Sender address of outgoing mail
    #[arg(long, default_value = "Viadro <no-reply@viadro.local>")]
    smtp_sender: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

/// Apply `VIADRO_*` environment overrides on top of the CLI values.
fn load_config(args: &Args) -> ServerConfig {
    let mut config = ServerConfig {
        environment: args.env.clone(),
        ..ServerConfig::default()
    };
    config.http.port = args.port;
    config.storage.root = (!args.in_memory_storage).then(|| args.storage_dir.clone());
    config.storage.public_base_url = args.public_base_url.clone();
    config.mail.sender = args.smtp_sender.clone();

    if let Ok(port) = std::env::var("VIADRO_PORT") {
        match port.parse() {
            Ok(p) => config.http.port = p,
            Err(_) => warn!(value = %port, "ignoring invalid VIADRO_PORT"),
        }
    }
    if let Ok(cost) = std::env::var("VIADRO_BCRYPT_COST") {
        match cost.parse() {
            Ok(c) => config.security.bcrypt_cost = c,
            Err(_) => warn!(value = %cost, "ignoring invalid VIADRO_BCRYPT_COST"),
        }
    }
    if let Ok(enabled) = std::env::var("VIADRO_CACHE_ENABLED") {
        config.cache.enabled = enabled != "false" && enabled != "0";
    }
    if let Ok(enabled) = std::env::var("VIADRO_RATE_LIMIT_ENABLED") {
        config.rate_limit.enabled = enabled != "false" && enabled != "0";
    }
    if let Ok(origins) = std::env::var("VIADRO_CORS_ORIGINS") {
        config.cors.allowed_origins = origins
            .split_whitespace()
            .map(str::to_string)
            .collect();
    }

    config
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(signal = "SIGINT", "shutting down server"),
        _ = terminate => info!(signal = "SIGTERM", "shutting down server"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let config = load_config(&args);
    let service = ViadroService::open(config)
        .await
        .context("failed to initialise server")?;

    service
        .run(shutdown_signal())
        .await
        .context("server terminated with an error")?;

    Ok(())
}
