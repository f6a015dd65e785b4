use std::process::ExitCode;

use rita_aloe::build_app;
use rita_aloe::config::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let bind_addr = config.bind_addr.clone();

    if let Err(err) = tokio::fs::create_dir_all(&config.upload_dir).await {
        error!("Failed to create upload directory: {err}");
        return ExitCode::FAILURE;
    }

    let app = match build_app(config).await {
        Ok(app) => app,
        Err(err) => {
            error!("Failed to prepare database: {err}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {bind_addr}: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!("Running at {bind_addr}");

    if let Err(err) = axum::serve(listener, app).await {
        error!("Server stopped: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
