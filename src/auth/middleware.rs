//! Authentication Middleware
//!
//! Axum middleware for JWT token validation and user authentication.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{jwt::JwtService, models::AuthUser};

/// Authentication middleware that validates JWT tokens and injects user info
pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Middleware function for validating JWT tokens.
    ///
    /// Accepts either a `Bearer` Authorization header or an `access_token`
    /// cookie, so both API clients and the browser UI work.
    pub async fn validate_token(
        State(jwt_service): State<Arc<JwtService>>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, StatusCode> {
        let token_opt = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|auth_header| {
                auth_header
                    .strip_prefix("Bearer ")
                    .map(|t| t.to_string())
            })
            .or_else(|| {
                req.headers()
                    .get(header::COOKIE)
                    .and_then(|cookie_header| cookie_header.to_str().ok())
                    .and_then(|cookie_str| {
                        for cookie in cookie_str.split(';') {
                            if let Some(rest) = cookie.trim().strip_prefix("access_token=") {
                                return Some(rest.to_string());
                            }
                        }
                        None
                    })
            });

        let token = match token_opt {
            Some(token) => token,
            None => {
                tracing::warn!(
                    "unauthenticated request to {} (no bearer token or cookie)",
                    req.uri()
                );
                return Err(StatusCode::UNAUTHORIZED);
            }
        };

        let claims = match jwt_service.validate_token(&token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("JWT validation failed: {:?}", e);
                return Err(StatusCode::UNAUTHORIZED);
            }
        };

        // Inject the user into request extensions for downstream handlers
        req.extensions_mut().insert(AuthUser {
            id: claims.sub,
            email: claims.email,
        });

        Ok(next.run(req).await)
    }
}
