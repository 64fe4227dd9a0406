// # Routes Module
//
// - This module contains all HTTP route handlers for the MMT Server.
// - Routes are organized by functionality into separate submodules.
//
//  ## Available Route Modules
// - `health`: Health check and monitoring endpoints
// - `auth`: Registration, login, and token issuance
// - `wallet`: Solana wallet balance endpoints
// - `pools`: AMM pool metadata endpoints
// - `mmt`: Market-making strategy and engine control endpoints

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

/// Health check and monitoring endpoints
pub mod health;

/// Registration, login, and token issuance
pub mod auth;

/// Solana wallet balance endpoints
pub mod wallet;

/// AMM pool metadata endpoints
pub mod pools;

/// Market-making strategy and engine control endpoints
pub mod mmt;

/// JSON error body shared by all route modules
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Shorthand for building an error reply
pub fn error_response(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
