//! # Wallet Routes
//!
//! Wallet-related API endpoints: SOL and SPL token balance fetching.
//! Centralizes blockchain reads on the backend instead of having the
//! frontend hit an RPC node directly.
//!
//! All endpoints require authentication via JWT middleware.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::routes::{ErrorResponse, error_response};
use crate::server::AppState;

/// Request parameters for wallet balance endpoint
#[derive(Debug, Deserialize)]
pub struct WalletBalanceQuery {
    /// The wallet public key (base58 encoded)
    pub public_key: String,
    /// Optional SPL token mint to include in the response (base58)
    pub mint: Option<String>,
}

/// Response structure for wallet balance
#[derive(Debug, Serialize)]
pub struct WalletBalanceResponse {
    /// SOL balance in SOL units (not lamports)
    pub sol_balance: f64,
    /// SPL token balance in ui units, when a mint was requested
    pub token_balance: Option<f64>,
    /// The public key that was queried
    pub public_key: String,
    /// The mint that was queried, if any
    pub mint: Option<String>,
}

/// Get wallet balance for SOL and an optional SPL token.
///
/// # Parameters
/// - `public_key`: the wallet address in base58 format
/// - `mint`: optional token mint; when present the response includes the
///   balance of the wallet's associated token account for that mint
pub async fn get_wallet_balance(
    State(state): State<AppState>,
    Query(query): Query<WalletBalanceQuery>,
) -> Result<Json<WalletBalanceResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!("Fetching wallet balance for: {}", query.public_key);

    let pubkey = Pubkey::from_str(&query.public_key).map_err(|e| {
        warn!("Invalid public key provided: {} - {}", query.public_key, e);
        error_response(StatusCode::BAD_REQUEST, format!("Invalid public key: {e}"))
    })?;

    let rpc_client = RpcClient::new(state.config.solana.rpc_url());

    let sol_balance = match rpc_client.get_balance(&pubkey).await {
        Ok(balance_lamports) => {
            debug!("SOL balance in lamports: {}", balance_lamports);
            balance_lamports as f64 / 1e9
        }
        Err(e) => {
            warn!("Failed to fetch SOL balance for {}: {}", query.public_key, e);
            return Err(error_response(
                StatusCode::BAD_GATEWAY,
                format!("Failed to fetch SOL balance: {e}"),
            ));
        }
    };

    let token_balance = match &query.mint {
        Some(mint_str) => {
            let mint = Pubkey::from_str(mint_str).map_err(|e| {
                warn!("Invalid mint provided: {} - {}", mint_str, e);
                error_response(StatusCode::BAD_REQUEST, format!("Invalid mint: {e}"))
            })?;
            Some(get_token_balance(&rpc_client, &pubkey, &mint).await)
        }
        None => None,
    };

    info!(
        "Balance fetched for {}: SOL={}, token={:?}",
        query.public_key, sol_balance, token_balance
    );

    Ok(Json(WalletBalanceResponse {
        sol_balance,
        token_balance,
        public_key: query.public_key,
        mint: query.mint,
    }))
}

/// Fetch the wallet's associated-token-account balance for a mint.
///
/// A missing token account means the wallet simply never held the token,
/// so that case reads as a zero balance rather than an error.
async fn get_token_balance(rpc_client: &RpcClient, wallet: &Pubkey, mint: &Pubkey) -> f64 {
    let ata = spl_associated_token_account::get_associated_token_address(wallet, mint);

    match rpc_client.get_token_account_balance(&ata).await {
        Ok(amount) => {
            let balance = amount.ui_amount.unwrap_or(0.0);
            debug!("Token balance for mint {mint}: {balance}");
            balance
        }
        Err(e) => {
            debug!("No token account for mint {mint} and wallet {wallet}: {e}");
            0.0
        }
    }
}
