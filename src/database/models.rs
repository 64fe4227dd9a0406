// Database Models
//
// Tokio-postgres compatible models for the MMT server: user accounts for
// auth, AMM pool metadata, and persisted per-pool strategy configurations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::mmt::strategy::StrategyConfig;

/// Trait for converting from tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error>
    where
        Self: Sized;
}

// ============================================================================
// USER & AUTH MODELS
// ============================================================================

/// User account information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub wallet_address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for User {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            wallet_address: row.try_get("wallet_address")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// ============================================================================
// AMM POOL MODELS
// ============================================================================

/// AMM pool metadata tracked by the server.
///
/// Reserves are operator-maintained snapshots in `NUMERIC` columns; live
/// reserves come from the on-chain vaults via the price feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmmPool {
    pub id: Uuid,
    pub name: String,
    /// Base token mint, base58.
    pub base_mint: String,
    /// Quote token mint, base58.
    pub quote_mint: String,
    /// Base token vault account, base58.
    pub base_vault: String,
    /// Quote token vault account, base58.
    pub quote_vault: String,
    pub base_reserve: Decimal,
    pub quote_reserve: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for AmmPool {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            base_mint: row.try_get("base_mint")?,
            quote_mint: row.try_get("quote_mint")?,
            base_vault: row.try_get("base_vault")?,
            quote_vault: row.try_get("quote_vault")?,
            base_reserve: row.try_get("base_reserve")?,
            quote_reserve: row.try_get("quote_reserve")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// ============================================================================
// STRATEGY MODELS
// ============================================================================

/// Persisted strategy configuration for one pool.
///
/// Columns mirror [`StrategyConfig`] one-to-one; the row additionally
/// carries the pool id and bookkeeping timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub pool_id: Uuid,
    pub config: StrategyConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for StrategyRecord {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        let config = StrategyConfig {
            base_spread: row.try_get("base_spread")?,
            bid_adjustment: row.try_get("bid_adjustment")?,
            ask_adjustment: row.try_get("ask_adjustment")?,
            check_interval: row.try_get::<_, i64>("check_interval")? as u64,
            min_trade_size: row.try_get("min_trade_size")?,
            max_trade_size: row.try_get("max_trade_size")?,
            trade_size_percentage: row.try_get("trade_size_percentage")?,
            target_ratio: row.try_get("target_ratio")?,
            rebalance_threshold: row.try_get("rebalance_threshold")?,
            max_position_size: row.try_get("max_position_size")?,
            max_slippage: row.try_get("max_slippage")?,
            stop_loss_percentage: row.try_get("stop_loss_percentage")?,
            emergency_stop: row.try_get("emergency_stop")?,
            enabled: row.try_get("enabled")?,
        };
        Ok(Self {
            pool_id: row.try_get("pool_id")?,
            config,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
