//! # Server Module
//!
//! HTTP server setup and route configuration for the MMT server.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::auth::jwt::JwtService;
use crate::auth::middleware::AuthMiddleware;
use crate::config::Config;
use crate::database::connection::DatabaseConnection;
use crate::database::migrations;
use crate::mmt::engine::EngineRegistry;
use crate::routes::{health, mmt, pools, wallet};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<DatabaseConnection>,
    pub jwt_service: Arc<JwtService>,
    pub engines: Arc<EngineRegistry>,
}

/// Starts the MMT HTTP server.
///
/// Builds the shared state (database pool, JWT service, engine registry)
/// from the provided configuration, wires up all routes, and serves until
/// the process is terminated.
pub async fn start(config: Config) -> anyhow::Result<()> {
    let config = Arc::new(config);

    let jwt_service = Arc::new(JwtService::new(
        &config.server.jwt_secret,
        chrono::Duration::hours(config.server.token_ttl_hours),
    ));

    let db = Arc::new(DatabaseConnection::from_settings(&config.database).await?);
    migrations::run(&db).await?;

    let app_state = AppState {
        config: Arc::clone(&config),
        db,
        jwt_service: Arc::clone(&jwt_service),
        engines: Arc::new(EngineRegistry::new()),
    };

    // Everything below requires a valid token.
    let protected_routes = Router::new()
        .route("/api/v1/wallet/balance", get(wallet::get_wallet_balance))
        .route("/api/v1/pools", get(pools::list_pools))
        .route("/api/v1/pools/{pool_id}", get(pools::get_pool))
        .route("/api/v1/pools/{pool_id}/price", get(pools::get_pool_price))
        .route(
            "/api/v1/mmt/strategy",
            get(mmt::get_strategy).post(mmt::save_strategy),
        )
        .route("/api/v1/mmt/strategy/update", post(mmt::update_strategy))
        .route("/api/v1/mmt/quote", post(mmt::preview_quote))
        .route("/api/v1/mmt/start", post(mmt::start_engine))
        .route("/api/v1/mmt/stop", post(mmt::stop_engine))
        .route("/api/v1/mmt/emergency-stop", post(mmt::emergency_stop))
        .route("/api/v1/mmt/status", get(mmt::engine_status))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&jwt_service),
            AuthMiddleware::validate_token,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let app = Router::new()
        .route("/ping", get(health::ping))
        .route("/api/v1/health/db", get(health::db_health))
        .merge(protected_routes)
        .merge(crate::routes::auth::create_routes(jwt_service))
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([
                        axum::http::Method::GET,
                        axum::http::Method::POST,
                        axum::http::Method::OPTIONS,
                    ])
                    .allow_headers([
                        axum::http::header::ORIGIN,
                        axum::http::header::CONTENT_TYPE,
                        axum::http::header::ACCEPT,
                        axum::http::header::AUTHORIZATION,
                    ])
                    .allow_credentials(true),
            ),
        )
        .with_state(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("🚀 MMT Server starting...");
    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/ping", addr);
    tracing::info!("💧 Pool endpoints available at http://{}/api/v1/pools", addr);
    tracing::info!("📈 MMT endpoints available at http://{}/api/v1/mmt/*", addr);
    tracing::info!("🌐 Cluster: {}", config.solana.cluster);

    axum::serve(listener, app).await?;
    Ok(())
}
