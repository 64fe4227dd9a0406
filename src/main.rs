//! # MMT Server
//!
//! HTTP API server for managing Solana wallets, AMM pools, and
//! market-making trading (MMT) strategies, built with Axum and Tokio.
//!
//! ## Features
//! - Async/await HTTP server using the Axum framework
//! - Structured logging with tracing
//! - JWT-authenticated API with argon2 password hashing
//! - PostgreSQL persistence for pools and strategy configurations
//! - Per-pool market-making engines with live config updates
//!
//! ## Architecture
//! The server is organized into modules:
//! - `server`: Core server initialization and route wiring
//! - `config`: Environment variable configuration management
//! - `mmt`: Strategy configuration, quote derivation, engine loop
//! - `services`: Price feeds backing the engines
//! - `database`: Connection pooling, models, strategy repository
//! - `routes`: HTTP route handlers organized by functionality
//!
//! ## Running the Server
//! ```bash
//! cargo run
//! ```
//!
//! The server listens on `http://0.0.0.0:3000` by default; verify with
//! ```bash
//! curl http://localhost:3000/ping
//! ```

mod auth;
mod config;
mod database;
mod mmt;
mod routes;
mod server;
mod services;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point.
///
/// Initializes the tracing subscriber, loads the configuration from the
/// environment, and starts the HTTP server. Runs until the process is
/// terminated.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env in development; ignored when absent.
    let _ = dotenv::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false) // Don't show module targets for cleaner output
                .compact(),
        )
        .init();

    tracing::info!("🏁 Starting MMT Server...");
    tracing::info!("📦 Package: {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tracing::info!("🏗️  Build profile: {}", if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    });

    let config = config::Config::from_env()?;
    server::start(config).await
}
