// Database Connection Management
//
// Handles PostgreSQL connection pooling using tokio-postgres and deadpool.
// The pool is built once at process start from the application Config and
// passed explicitly to everything that needs persistence.

use anyhow::{Context, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseSettings;
use crate::database::models::{AmmPool, FromRow, StrategyRecord, User};
use crate::mmt::strategy::{StrategyConfig, StrategyPatch};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_size: usize,
    pub timeouts: deadpool_postgres::Timeouts,
}

impl DatabaseConfig {
    /// Build pool configuration from the application settings.
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self> {
        let config = tokio_postgres::Config::from_str(&settings.url)
            .context("Failed to parse DATABASE_URL")?;

        Ok(Self {
            host: config
                .get_hosts()
                .first()
                .map(|h| match h {
                    tokio_postgres::config::Host::Tcp(s) => s.clone(),
                    tokio_postgres::config::Host::Unix(s) => s.to_string_lossy().to_string(),
                })
                .unwrap_or_default(),
            port: config.get_ports().first().cloned().unwrap_or(5432),
            user: config.get_user().map(|u| u.to_string()).unwrap_or_default(),
            password: config
                .get_password()
                .map(|p| String::from_utf8_lossy(p).to_string())
                .unwrap_or_default(),
            dbname: config
                .get_dbname()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            max_size: settings.max_connections,
            timeouts: deadpool_postgres::Timeouts {
                wait: Some(Duration::from_secs(30)),
                create: Some(Duration::from_secs(30)),
                recycle: Some(Duration::from_secs(30)),
            },
        })
    }
}

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: Pool,
}

impl DatabaseConnection {
    /// Create a new database connection with the provided configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let masked_host = format!("{}:{}/{}", config.host, config.port, config.dbname);
        tracing::info!("🔌 Connecting to database: {}", masked_host);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.dbname(&config.dbname);

        let tls_connector = TlsConnector::builder()
            .build()
            .context("Failed to build TLS connector")?;
        let tls = MakeTlsConnector::new(tls_connector);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, tls, mgr_config);

        let pool = Pool::builder(mgr)
            .max_size(config.max_size)
            .wait_timeout(config.timeouts.wait)
            .create_timeout(config.timeouts.create)
            .recycle_timeout(config.timeouts.recycle)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .context("Failed to create database pool")?;

        // Test the connection
        let client = pool
            .get()
            .await
            .context("Failed to get connection from pool")?;
        client
            .query("SELECT 1", &[])
            .await
            .context("Failed to test database connection")?;

        tracing::info!("✅ Database connection established successfully");

        Ok(Self { pool })
    }

    /// Create connection from the application settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self> {
        let config = DatabaseConfig::from_settings(settings)?;
        Self::new(config).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get connection for health check")?;

        client
            .query("SELECT 1", &[])
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Get database connection statistics
    pub fn stats(&self) -> ConnectionStats {
        let status = self.pool.status();
        ConnectionStats {
            size: status.size as u32,
            idle: status.available,
        }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Fetch a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt("SELECT * FROM users WHERE email = $1", &[&email])
            .await
            .context("Failed to query user by email")?;
        row.map(|r| User::from_row(&r))
            .transpose()
            .context("Failed to decode user row")
    }

    /// Fetch a user by id
    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt("SELECT * FROM users WHERE id = $1", &[&id])
            .await
            .context("Failed to query user by id")?;
        row.map(|r| User::from_row(&r))
            .transpose()
            .context("Failed to decode user row")
    }

    /// Insert a new user and return the stored row
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        wallet_address: Option<&str>,
    ) -> Result<User> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_one(
                "INSERT INTO users (email, password_hash, wallet_address)
                 VALUES ($1, $2, $3)
                 RETURNING *",
                &[&email, &password_hash, &wallet_address],
            )
            .await
            .context("Failed to insert user")?;
        User::from_row(&row).context("Failed to decode inserted user")
    }

    // ------------------------------------------------------------------
    // AMM pools
    // ------------------------------------------------------------------

    /// List all pools, active first, newest first within each group
    pub async fn list_pools(&self) -> Result<Vec<AmmPool>> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let rows = client
            .query(
                "SELECT * FROM amm_pools ORDER BY is_active DESC, created_at DESC",
                &[],
            )
            .await
            .context("Failed to list pools")?;
        rows.iter()
            .map(|r| AmmPool::from_row(r))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode pool rows")
    }

    /// Fetch one pool by id
    pub async fn get_pool(&self, pool_id: Uuid) -> Result<Option<AmmPool>> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt("SELECT * FROM amm_pools WHERE id = $1", &[&pool_id])
            .await
            .context("Failed to query pool")?;
        row.map(|r| AmmPool::from_row(&r))
            .transpose()
            .context("Failed to decode pool row")
    }

    // ------------------------------------------------------------------
    // Strategy repository: load / save / update
    // ------------------------------------------------------------------

    /// Load the persisted strategy for a pool
    pub async fn load_strategy(&self, pool_id: Uuid) -> Result<Option<StrategyRecord>> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "SELECT * FROM mmt_strategies WHERE pool_id = $1",
                &[&pool_id],
            )
            .await
            .context("Failed to query strategy")?;
        row.map(|r| StrategyRecord::from_row(&r))
            .transpose()
            .context("Failed to decode strategy row")
    }

    /// Upsert the full strategy configuration for a pool
    pub async fn save_strategy(
        &self,
        pool_id: Uuid,
        config: &StrategyConfig,
    ) -> Result<StrategyRecord> {
        let client = self.pool.get().await.context("Failed to get DB connection")?;
        let row = client
            .query_one(
                "INSERT INTO mmt_strategies (
                    pool_id, base_spread, bid_adjustment, ask_adjustment,
                    check_interval, min_trade_size, max_trade_size,
                    trade_size_percentage, target_ratio, rebalance_threshold,
                    max_position_size, max_slippage, stop_loss_percentage,
                    emergency_stop, enabled
                 )
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                 ON CONFLICT (pool_id) DO UPDATE SET
                    base_spread = EXCLUDED.base_spread,
                    bid_adjustment = EXCLUDED.bid_adjustment,
                    ask_adjustment = EXCLUDED.ask_adjustment,
                    check_interval = EXCLUDED.check_interval,
                    min_trade_size = EXCLUDED.min_trade_size,
                    max_trade_size = EXCLUDED.max_trade_size,
                    trade_size_percentage = EXCLUDED.trade_size_percentage,
                    target_ratio = EXCLUDED.target_ratio,
                    rebalance_threshold = EXCLUDED.rebalance_threshold,
                    max_position_size = EXCLUDED.max_position_size,
                    max_slippage = EXCLUDED.max_slippage,
                    stop_loss_percentage = EXCLUDED.stop_loss_percentage,
                    emergency_stop = EXCLUDED.emergency_stop,
                    enabled = EXCLUDED.enabled,
                    updated_at = NOW()
                 RETURNING *",
                &[
                    &pool_id,
                    &config.base_spread,
                    &config.bid_adjustment,
                    &config.ask_adjustment,
                    &(config.check_interval as i64),
                    &config.min_trade_size,
                    &config.max_trade_size,
                    &config.trade_size_percentage,
                    &config.target_ratio,
                    &config.rebalance_threshold,
                    &config.max_position_size,
                    &config.max_slippage,
                    &config.stop_loss_percentage,
                    &config.emergency_stop,
                    &config.enabled,
                ],
            )
            .await
            .context("Failed to upsert strategy")?;
        StrategyRecord::from_row(&row).context("Failed to decode saved strategy")
    }

    /// Apply a partial update to a pool's strategy and return the result.
    ///
    /// Read-modify-write: missing strategies start from `defaults` so a
    /// patch against a fresh pool still produces a full record. The
    /// patched configuration is validated right here, against the exact
    /// value being written, so no interleaved save can sneak an
    /// unvalidated combination into the table.
    pub async fn update_strategy(
        &self,
        pool_id: Uuid,
        patch: &StrategyPatch,
        defaults: &StrategyConfig,
    ) -> Result<StrategyRecord> {
        let current = self
            .load_strategy(pool_id)
            .await?
            .map(|r| r.config)
            .unwrap_or_else(|| defaults.clone());

        let next = current.apply(patch);
        next.validate().map_err(anyhow::Error::new)?;

        self.save_strategy(pool_id, &next).await
    }
}

/// Database connection statistics
#[derive(Debug, serde::Serialize)]
pub struct ConnectionStats {
    pub size: u32,
    pub idle: usize,
}
