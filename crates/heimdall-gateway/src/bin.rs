/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Heimdall Gateway CLI application
//!
//! This module provides the command-line interface for the Heimdall gateway.
//! It includes functionality for serving the gateway and for probing the
//! upstream identity & data API.

use axum::http::{HeaderName, Method};
use clap::{Parser, Subcommand};
use heimdall_gateway::api::{self, AppState};
use heimdall_gateway::upstream::SupabaseApi;
use heimdall_utils::config::{Cors, Settings};
use heimdall_utils::logging::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Number of attempts `check-upstream` makes before giving up.
const UPSTREAM_PROBE_ATTEMPTS: u32 = 5;

/// Command-line interface structure
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file
    #[arg(long, env = "HEIMDALL_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the CLI
#[derive(Subcommand)]
enum Commands {
    /// Start the Heimdall gateway server
    Serve,
    /// Probe the upstream identity & data API and exit
    CheckUpstream,
}

/// Main function to run the Heimdall gateway application
///
/// This function initializes the application, parses command-line arguments,
/// and executes the appropriate command based on user input.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let config = Settings::new(cli.config).expect("Failed to load configuration");

    // Initialize logger
    heimdall_utils::logging::init_with_format(&config.log.level, &config.log.format)
        .expect("Failed to initialize logger");

    // Execute the appropriate command
    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::CheckUpstream => check_upstream(&config).await?,
    }
    Ok(())
}

/// Function to start the Heimdall gateway server
///
/// This function builds the shared upstream client, configures API routes,
/// and starts the server with graceful shutdown support.
async fn serve(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Heimdall gateway");

    // Build the upstream client once; every request shares it
    info!("Creating upstream API client for {}", config.upstream.url);
    let upstream = Arc::new(SupabaseApi::new(&config.upstream)?);

    let settings = Arc::new(config);
    let state = AppState::new(upstream, settings.clone());

    // Configure API routes
    info!("Configuring API routes");
    let app = api::configure_api_routes(state.clone())
        .layer(cors_layer(&settings.cors))
        .with_state(state);

    // Set up the server address
    let addr = settings.gateway.bind_address.clone();
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Set up shutdown signal handler
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
        shutdown_tx.send(()).ok();
    });

    // Start the server with graceful shutdown
    info!("Heimdall gateway is now running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown(shutdown_rx))
        .await?;

    Ok(())
}

/// Handles the shutdown process for the gateway.
async fn shutdown(shutdown_rx: oneshot::Receiver<()>) {
    let _ = shutdown_rx.await;
    info!("Shutting down");
}

/// Probes the upstream auth health endpoint with bounded retries.
async fn check_upstream(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let upstream = SupabaseApi::new(&config.upstream)?;

    for attempt in 1..=UPSTREAM_PROBE_ATTEMPTS {
        match upstream.health_check().await {
            Ok(()) => {
                info!("Upstream at {} is healthy", config.upstream.url);
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "Upstream at {} not ready (attempt {}/{}): {}",
                    config.upstream.url, attempt, UPSTREAM_PROBE_ATTEMPTS, e
                );
            }
        }
        if attempt < UPSTREAM_PROBE_ATTEMPTS {
            sleep(Duration::from_secs(1)).await;
        }
    }

    error!(
        "Upstream at {} unreachable after {} attempts",
        config.upstream.url, UPSTREAM_PROBE_ATTEMPTS
    );
    Err("Upstream identity & data API is not reachable".into())
}

/// Builds the CORS layer from the `[cors]` settings section.
fn cors_layer(config: &Cors) -> CorsLayer {
    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    let headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();

    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::list(headers))
        .max_age(Duration::from_secs(config.max_age_seconds))
}
