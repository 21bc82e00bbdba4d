use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use koinonia::auth::google::{GoogleVerifier, IdentityVerifier};
use koinonia::config::Config;
use koinonia::AppState;

#[derive(Parser, Debug)]
#[command(name = "koinonia")]
#[command(author, version, about = "Church community backend", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "koinonia.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Koinonia v{}", env!("CARGO_PKG_VERSION"));

    let default_secrets = config.auth.default_secrets_in_use();
    if !default_secrets.is_empty() {
        tracing::warn!(
            "Running with default token secrets ({}); set them in the config file before \
             exposing this server",
            default_secrets.join(", ")
        );
    }

    // Initialize database
    let db = koinonia::db::init(&config.server.data_dir).await?;

    // Google sign-in is optional; without a client id the route returns
    // a configuration error instead of calling Google.
    let google: Option<Arc<dyn IdentityVerifier>> = match &config.google.client_id {
        Some(client_id) => {
            tracing::info!("Google sign-in enabled");
            Some(Arc::new(GoogleVerifier::new(client_id.clone())))
        }
        None => {
            tracing::info!("Google sign-in disabled (no google.client_id configured)");
            None
        }
    };

    let state = Arc::new(AppState::new(config.clone(), db, google));
    let app = koinonia::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
