//! Render worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spindle_worker::{ApiClient, Renderer, WorkerConfig, WorkerLoop};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("spindle=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting spindle-worker");

    // Load configuration; the only fatal failures live here and in
    // renderer construction below.
    let config = match WorkerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        worker_id = %config.worker_id,
        api_base_url = %config.api_base_url,
        "Worker config loaded"
    );

    let client = match ApiClient::new(&config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    let renderer = match Renderer::new(&config).await {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to create renderer: {}", e);
            std::process::exit(1);
        }
    };

    let worker = Arc::new(WorkerLoop::new(config, client, renderer));

    // Shutdown on ctrl-c
    let shutdown_worker = Arc::clone(&worker);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_worker.shutdown();
    });

    worker.run().await;

    info!("Worker shutdown complete");
}
