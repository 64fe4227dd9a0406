//! # MMT Routes
//!
//! Strategy configuration CRUD, quote preview, and engine lifecycle
//! control (start / stop / emergency stop / status) per pool.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::StrategyRecord;
use crate::mmt::engine::{EngineStatus, Inventory, LoggingQuoteSink};
use crate::mmt::error::MmtError;
use crate::mmt::quoting::{Quote, quote_checked};
use crate::mmt::strategy::{StrategyConfig, StrategyPatch};
use crate::routes::pools::{load_pool, reserve_feed};
use crate::routes::{ErrorResponse, error_response};
use crate::server::AppState;
use crate::services::price_feed::{HttpPriceFeed, PriceFeed};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn domain_error(e: MmtError) -> ApiError {
    let status = match &e {
        MmtError::InvalidInput(_) | MmtError::Configuration(_) => StatusCode::BAD_REQUEST,
        MmtError::NotRunning(_) => StatusCode::NOT_FOUND,
        MmtError::AlreadyRunning(_) => StatusCode::CONFLICT,
        MmtError::PriceFeed(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(status, e.to_string())
}

fn db_error(e: anyhow::Error, what: &str) -> ApiError {
    warn!("{what} failed: {e:#}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{what} failed"))
}

/// Repository calls surface domain errors (e.g. a patch producing an
/// invalid configuration) wrapped in `anyhow`; unwrap those back into
/// their proper status codes instead of a blanket 500.
fn repo_error(e: anyhow::Error, what: &str) -> ApiError {
    match e.downcast::<MmtError>() {
        Ok(domain) => domain_error(domain),
        Err(e) => db_error(e, what),
    }
}

// ---------------------------------------------------------------------------
// Strategy CRUD
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StrategyQuery {
    pub pool_id: Uuid,
}

/// Load the persisted strategy for a pool
pub async fn get_strategy(
    State(state): State<AppState>,
    Query(query): Query<StrategyQuery>,
) -> Result<Json<StrategyRecord>, ApiError> {
    let record = state
        .db
        .load_strategy(query.pool_id)
        .await
        .map_err(|e| db_error(e, "Strategy load"))?
        .ok_or_else(|| {
            error_response(
                StatusCode::NOT_FOUND,
                format!("No strategy configured for pool {}", query.pool_id),
            )
        })?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct SaveStrategyRequest {
    pub pool_id: Uuid,
    pub config: StrategyConfig,
}

/// Save (upsert) the full strategy configuration for a pool.
///
/// If an engine is running for the pool, the new configuration is pushed
/// into it as well, so the next tick uses it.
pub async fn save_strategy(
    State(state): State<AppState>,
    Json(req): Json<SaveStrategyRequest>,
) -> Result<Json<StrategyRecord>, ApiError> {
    req.config.validate().map_err(domain_error)?;
    load_pool(&state, req.pool_id).await?;

    let record = state
        .db
        .save_strategy(req.pool_id, &req.config)
        .await
        .map_err(|e| db_error(e, "Strategy save"))?;

    if state.engines.is_running(req.pool_id) {
        state
            .engines
            .update_config(req.pool_id, record.config.clone())
            .await
            .map_err(domain_error)?;
    }

    info!("strategy saved for pool {}", req.pool_id);
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStrategyRequest {
    pub pool_id: Uuid,
    pub patch: StrategyPatch,
}

/// Apply a partial strategy update
pub async fn update_strategy(
    State(state): State<AppState>,
    Json(req): Json<UpdateStrategyRequest>,
) -> Result<Json<StrategyRecord>, ApiError> {
    load_pool(&state, req.pool_id).await?;

    let record = state
        .db
        .update_strategy(
            req.pool_id,
            &req.patch,
            &state.config.mmt.default_strategy(),
        )
        .await
        .map_err(|e| repo_error(e, "Strategy update"))?;

    if state.engines.is_running(req.pool_id) {
        state
            .engines
            .update_config(req.pool_id, record.config.clone())
            .await
            .map_err(domain_error)?;
    }

    info!("strategy updated for pool {}", req.pool_id);
    Ok(Json(record))
}

// ---------------------------------------------------------------------------
// Quote preview
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct QuotePreviewRequest {
    /// Inline configuration; takes precedence over `pool_id`
    pub config: Option<StrategyConfig>,
    /// Pool whose persisted strategy should be used
    pub pool_id: Option<Uuid>,
    pub reference_price: f64,
}

#[derive(Debug, Serialize)]
pub struct QuotePreviewResponse {
    pub reference_price: f64,
    pub quote: Quote,
}

/// Derive the bid/ask pair a configuration would quote at a given
/// reference price, without touching any engine.
pub async fn preview_quote(
    State(state): State<AppState>,
    Json(req): Json<QuotePreviewRequest>,
) -> Result<Json<QuotePreviewResponse>, ApiError> {
    let config = match (req.config, req.pool_id) {
        (Some(config), _) => config,
        (None, Some(pool_id)) => state
            .db
            .load_strategy(pool_id)
            .await
            .map_err(|e| db_error(e, "Strategy load"))?
            .map(|r| r.config)
            .ok_or_else(|| {
                error_response(
                    StatusCode::NOT_FOUND,
                    format!("No strategy configured for pool {pool_id}"),
                )
            })?,
        (None, None) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Either config or pool_id is required",
            ));
        }
    };

    let quote = quote_checked(&config, req.reference_price).map_err(domain_error)?;
    Ok(Json(QuotePreviewResponse {
        reference_price: req.reference_price,
        quote,
    }))
}

// ---------------------------------------------------------------------------
// Engine lifecycle
// ---------------------------------------------------------------------------

/// Which price source a started engine should use
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// HTTP price API (mint pair)
    #[default]
    PriceApi,
    /// Implied price from the pool's on-chain vault reserves
    PoolReserves,
}

#[derive(Debug, Deserialize)]
pub struct StartEngineRequest {
    pub pool_id: Uuid,
    /// Base-asset holdings the engine sizes against, in base units
    pub base_amount: f64,
    /// Quote-asset holdings, in quote units
    pub quote_amount: f64,
    #[serde(default)]
    pub feed: FeedKind,
}

#[derive(Debug, Serialize)]
pub struct EngineActionResponse {
    pub pool_id: Uuid,
    pub status: String,
    pub message: String,
}

/// Start the market-making engine for a pool using its persisted strategy
pub async fn start_engine(
    State(state): State<AppState>,
    Json(req): Json<StartEngineRequest>,
) -> Result<Json<EngineActionResponse>, ApiError> {
    let pool = load_pool(&state, req.pool_id).await?;

    let config = state
        .db
        .load_strategy(req.pool_id)
        .await
        .map_err(|e| db_error(e, "Strategy load"))?
        .map(|r| r.config)
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                format!("Pool {} has no strategy configured, save one first", req.pool_id),
            )
        })?;

    let feed: Arc<dyn PriceFeed> = match req.feed {
        FeedKind::PriceApi => Arc::new(HttpPriceFeed::new(
            state.config.solana.price_api_url.clone(),
            pool.base_mint.clone(),
            pool.quote_mint.clone(),
        )),
        FeedKind::PoolReserves => Arc::new(reserve_feed(&state, &pool)?),
    };

    state
        .engines
        .start(
            req.pool_id,
            config,
            Inventory {
                base_amount: req.base_amount,
                quote_amount: req.quote_amount,
            },
            feed,
            Arc::new(LoggingQuoteSink),
        )
        .map_err(domain_error)?;

    Ok(Json(EngineActionResponse {
        pool_id: req.pool_id,
        status: "started".to_string(),
        message: format!("Engine started for pool {}", pool.name),
    }))
}

#[derive(Debug, Deserialize)]
pub struct EngineTargetRequest {
    pub pool_id: Uuid,
}

/// Stop the pool's engine
pub async fn stop_engine(
    State(state): State<AppState>,
    Json(req): Json<EngineTargetRequest>,
) -> Result<Json<EngineActionResponse>, ApiError> {
    state.engines.stop(req.pool_id).await.map_err(domain_error)?;
    Ok(Json(EngineActionResponse {
        pool_id: req.pool_id,
        status: "stopped".to_string(),
        message: "Engine stopped".to_string(),
    }))
}

/// Emergency stop: trip the flag, tear the engine down, and persist the
/// flag so a later restart stays suppressed until an operator clears it.
pub async fn emergency_stop(
    State(state): State<AppState>,
    Json(req): Json<EngineTargetRequest>,
) -> Result<Json<EngineActionResponse>, ApiError> {
    warn!("emergency stop requested for pool {}", req.pool_id);
    load_pool(&state, req.pool_id).await?;

    if state.engines.is_running(req.pool_id) {
        state
            .engines
            .emergency_stop(req.pool_id)
            .await
            .map_err(domain_error)?;
    }

    let patch = StrategyPatch {
        emergency_stop: Some(true),
        ..Default::default()
    };
    state
        .db
        .update_strategy(
            req.pool_id,
            &patch,
            &state.config.mmt.default_strategy(),
        )
        .await
        .map_err(|e| repo_error(e, "Strategy update"))?;

    Ok(Json(EngineActionResponse {
        pool_id: req.pool_id,
        status: "emergency_stopped".to_string(),
        message: "Emergency stop engaged and persisted".to_string(),
    }))
}

/// Status of all running engines
pub async fn engine_status(State(state): State<AppState>) -> Json<Vec<EngineStatus>> {
    Json(state.engines.status().await)
}
