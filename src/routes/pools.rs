//! # Pool Routes
//!
//! Read endpoints over the AMM pool metadata the server tracks, plus a
//! live implied-price lookup from the pool's on-chain vaults.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use crate::database::models::AmmPool;
use crate::routes::{ErrorResponse, error_response};
use crate::server::AppState;
use crate::services::price_feed::{PoolReservePriceFeed, PriceFeed};

/// List all tracked pools
pub async fn list_pools(
    State(state): State<AppState>,
) -> Result<Json<Vec<AmmPool>>, (StatusCode, Json<ErrorResponse>)> {
    let pools = state.db.list_pools().await.map_err(|e| {
        warn!("pool listing failed: {e:#}");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list pools")
    })?;
    Ok(Json(pools))
}

/// Fetch one pool by id
pub async fn get_pool(
    State(state): State<AppState>,
    Path(pool_id): Path<Uuid>,
) -> Result<Json<AmmPool>, (StatusCode, Json<ErrorResponse>)> {
    let pool = load_pool(&state, pool_id).await?;
    Ok(Json(pool))
}

/// Current implied price response
#[derive(Debug, Serialize)]
pub struct PoolPriceResponse {
    pub pool_id: Uuid,
    /// Quote units per base unit, implied by the vault reserves
    pub price: f64,
}

/// Current implied price of the pool, read from its on-chain vaults
pub async fn get_pool_price(
    State(state): State<AppState>,
    Path(pool_id): Path<Uuid>,
) -> Result<Json<PoolPriceResponse>, (StatusCode, Json<ErrorResponse>)> {
    let pool = load_pool(&state, pool_id).await?;
    let feed = reserve_feed(&state, &pool)?;

    let price = feed.reference_price().await.map_err(|e| {
        warn!("price lookup failed for pool {pool_id}: {e}");
        error_response(StatusCode::BAD_GATEWAY, format!("Price lookup failed: {e}"))
    })?;

    Ok(Json(PoolPriceResponse { pool_id, price }))
}

pub(crate) async fn load_pool(
    state: &AppState,
    pool_id: Uuid,
) -> Result<AmmPool, (StatusCode, Json<ErrorResponse>)> {
    state
        .db
        .get_pool(pool_id)
        .await
        .map_err(|e| {
            warn!("pool lookup failed: {e:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load pool")
        })?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Unknown pool {pool_id}")))
}

pub(crate) fn reserve_feed(
    state: &AppState,
    pool: &AmmPool,
) -> Result<PoolReservePriceFeed, (StatusCode, Json<ErrorResponse>)> {
    let base_vault = Pubkey::from_str(&pool.base_vault).map_err(|e| {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Pool {} has an invalid base vault: {e}", pool.id),
        )
    })?;
    let quote_vault = Pubkey::from_str(&pool.quote_vault).map_err(|e| {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Pool {} has an invalid quote vault: {e}", pool.id),
        )
    })?;

    Ok(PoolReservePriceFeed::new(
        state.config.solana.rpc_url(),
        base_vault,
        quote_vault,
    ))
}
