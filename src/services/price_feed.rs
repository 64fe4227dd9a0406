//! Reference price sources for the MMT engine.
//!
//! Each feed is constructed for a single pool and produces the current
//! market price of the base asset in quote-currency units. The engine only
//! sees the trait, so tests and dry runs can substitute a fixed feed.

use async_trait::async_trait;
use serde::Deserialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::mmt::error::MmtError;

/// Source of the current reference price for one pool.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn reference_price(&self) -> Result<f64, MmtError>;
}

/// Price feed backed by an HTTP price API (Jupiter-style endpoint).
pub struct HttpPriceFeed {
    client: reqwest::Client,
    base_url: String,
    base_mint: String,
    quote_mint: String,
}

#[derive(Debug, Deserialize)]
struct PriceApiResponse {
    data: HashMap<String, PriceApiEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceApiEntry {
    price: f64,
}

impl HttpPriceFeed {
    pub fn new(base_url: String, base_mint: String, quote_mint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            base_mint,
            quote_mint,
        }
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn reference_price(&self) -> Result<f64, MmtError> {
        let url = format!(
            "{}/price?ids={}&vsToken={}",
            self.base_url, self.base_mint, self.quote_mint
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MmtError::PriceFeed(format!("price API request failed: {e}")))?
            .error_for_status()
            .map_err(|e| MmtError::PriceFeed(format!("price API returned error: {e}")))?;

        let body: PriceApiResponse = response
            .json()
            .await
            .map_err(|e| MmtError::PriceFeed(format!("malformed price API response: {e}")))?;

        let entry = body
            .data
            .get(&self.base_mint)
            .ok_or_else(|| MmtError::PriceFeed(format!("no price for mint {}", self.base_mint)))?;

        tracing::debug!("price API {}: {}", self.base_mint, entry.price);
        Ok(entry.price)
    }
}

/// Price feed derived from a pool's on-chain token vault balances.
///
/// The implied price is `quote_reserve / base_reserve`, both read as
/// ui amounts so token decimals are already applied.
pub struct PoolReservePriceFeed {
    rpc: RpcClient,
    base_vault: Pubkey,
    quote_vault: Pubkey,
}

impl PoolReservePriceFeed {
    pub fn new(rpc_url: String, base_vault: Pubkey, quote_vault: Pubkey) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url),
            base_vault,
            quote_vault,
        }
    }

    async fn vault_balance(&self, vault: &Pubkey) -> Result<f64, MmtError> {
        let balance = self
            .rpc
            .get_token_account_balance(vault)
            .await
            .map_err(|e| MmtError::PriceFeed(format!("vault {vault} balance query failed: {e}")))?;

        balance
            .ui_amount
            .ok_or_else(|| MmtError::PriceFeed(format!("vault {vault} has no ui amount")))
    }
}

#[async_trait]
impl PriceFeed for PoolReservePriceFeed {
    async fn reference_price(&self) -> Result<f64, MmtError> {
        let base = self.vault_balance(&self.base_vault).await?;
        let quote = self.vault_balance(&self.quote_vault).await?;

        if base <= 0.0 {
            return Err(MmtError::PriceFeed(format!(
                "base vault {} is empty, implied price undefined",
                self.base_vault
            )));
        }

        let price = quote / base;
        tracing::debug!("pool reserves {base}/{quote}, implied price {price}");
        Ok(price)
    }
}

/// Fixed price feed for tests and dry runs. The price can be swapped out
/// between engine ticks.
pub struct FixedPriceFeed {
    price: Mutex<f64>,
}

impl FixedPriceFeed {
    pub fn new(price: f64) -> Self {
        Self {
            price: Mutex::new(price),
        }
    }

    pub fn set(&self, price: f64) {
        *self.price.lock().unwrap() = price;
    }
}

#[async_trait]
impl PriceFeed for FixedPriceFeed {
    async fn reference_price(&self) -> Result<f64, MmtError> {
        Ok(*self.price.lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_feed_returns_latest_price() {
        let feed = FixedPriceFeed::new(100.0);
        assert_eq!(feed.reference_price().await.unwrap(), 100.0);

        feed.set(105.5);
        assert_eq!(feed.reference_price().await.unwrap(), 105.5);
    }
}
