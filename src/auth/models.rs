//! Authentication Models
//!
//! Data structures for authentication requests, responses, and user
//! information injected into request extensions by the middleware.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user extracted from a validated JWT
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Optional Solana wallet to associate with the account, base58.
    pub wallet_address: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token response returned on successful register/login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: Uuid,
    pub email: String,
}
