//! Configuration module for environment variables and application settings.
//!
//! `Config::from_env` is called once in `main` and the resulting value is
//! passed explicitly to everything that needs it. There is intentionally no
//! lazily-initialized global here: construction order is visible at the
//! entry point and tests can build a `Config` by hand.

use anyhow::{Result, anyhow};
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::mmt::strategy::StrategyConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseSettings,

    /// Server configuration
    pub server: ServerConfig,

    /// Solana network configuration
    pub solana: SolanaConfig,

    /// Market-making defaults
    pub mmt: MmtConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Lifetime of issued tokens and their cookies, in hours.
    pub token_ttl_hours: i64,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SolanaConfig {
    pub cluster: Cluster,
    /// Explicit RPC endpoint; overrides the cluster default when set.
    pub rpc_url_override: Option<String>,
    /// Base URL of the HTTP price API used by the price feed.
    pub price_api_url: String,
}

impl SolanaConfig {
    /// Resolve the RPC endpoint: explicit override first, then the
    /// cluster's public default.
    pub fn rpc_url(&self) -> String {
        self.rpc_url_override
            .clone()
            .unwrap_or_else(|| self.cluster.default_rpc_url().to_string())
    }
}

/// Solana network selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    MainnetBeta,
    Devnet,
    Testnet,
    Localnet,
}

impl Cluster {
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Localnet => "http://127.0.0.1:8899",
        }
    }
}

impl FromStr for Cluster {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Cluster::MainnetBeta),
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            other => Err(anyhow!("unknown Solana cluster: {other}")),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Localnet => "localnet",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct MmtConfig {
    /// Default seconds between strategy evaluations for new strategies.
    pub default_check_interval: u64,
}

impl MmtConfig {
    /// Baseline strategy for pools that have none persisted yet; the
    /// repository starts partial updates from this.
    pub fn default_strategy(&self) -> StrategyConfig {
        StrategyConfig {
            check_interval: self.default_check_interval,
            ..Default::default()
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseSettings {
                url: env::var("DATABASE_URL")
                    .map_err(|_| anyhow!("DATABASE_URL environment variable is required"))?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "16".to_string())
                    .parse()
                    .unwrap_or(16),
            },

            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .or_else(|_| env::var("SERVER_PORT"))
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "dev_secret".to_string()),
                token_ttl_hours: env::var("JWT_TTL_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .unwrap_or(24),
                allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3001".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },

            solana: SolanaConfig {
                cluster: env::var("SOLANA_CLUSTER")
                    .unwrap_or_else(|_| "devnet".to_string())
                    .parse()?,
                rpc_url_override: env::var("SOLANA_RPC_URL").ok(),
                price_api_url: env::var("PRICE_API_URL")
                    .unwrap_or_else(|_| "https://price.jup.ag/v4".to_string()),
            },

            mmt: MmtConfig {
                default_check_interval: env::var("MMT_CHECK_INTERVAL_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_parsing() {
        assert_eq!("devnet".parse::<Cluster>().unwrap(), Cluster::Devnet);
        assert_eq!(
            "mainnet-beta".parse::<Cluster>().unwrap(),
            Cluster::MainnetBeta
        );
        assert_eq!("MAINNET".parse::<Cluster>().unwrap(), Cluster::MainnetBeta);
        assert!("moonnet".parse::<Cluster>().is_err());
    }

    #[test]
    fn rpc_override_wins_over_cluster_default() {
        let solana = SolanaConfig {
            cluster: Cluster::Devnet,
            rpc_url_override: Some("https://rpc.example.com".to_string()),
            price_api_url: "https://price.jup.ag/v4".to_string(),
        };
        assert_eq!(solana.rpc_url(), "https://rpc.example.com");

        let solana = SolanaConfig {
            rpc_url_override: None,
            ..solana
        };
        assert_eq!(solana.rpc_url(), "https://api.devnet.solana.com");
    }

    #[test]
    fn default_strategy_uses_configured_interval() {
        let mmt = MmtConfig {
            default_check_interval: 45,
        };
        let strategy = mmt.default_strategy();
        assert_eq!(strategy.check_interval, 45);
        strategy.validate().unwrap();
    }
}
