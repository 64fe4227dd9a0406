//! Auth routes for registration, login, and user info

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, warn};

use crate::auth::models::{AuthUser, LoginRequest, RegisterRequest, TokenResponse};
use crate::routes::{ErrorResponse, error_response};
use crate::server::AppState;

type AuthResult = Result<(CookieJar, Json<TokenResponse>), (StatusCode, Json<ErrorResponse>)>;

/// Register a new operator account
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> AuthResult {
    if req.password.len() < 8 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        ));
    }

    if let Ok(Some(_)) = state.db.get_user_by_email(&req.email).await {
        return Err(error_response(
            StatusCode::CONFLICT,
            "An account with this email already exists",
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            warn!("password hashing failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password")
        })?
        .to_string();

    let user = state
        .db
        .create_user(&req.email, &password_hash, req.wallet_address.as_deref())
        .await
        .map_err(|e| {
            warn!("user insert failed: {e:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create account")
        })?;

    info!("registered new account {}", user.email);
    issue_token(&state, jar, user.id, user.email)
}

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> AuthResult {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await
        .map_err(|e| {
            warn!("user lookup failed: {e:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed")
        })?
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;

    let parsed = PasswordHash::new(&user.password_hash).map_err(|e| {
        warn!("stored password hash for {} is malformed: {e}", user.email);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed")
    })?;

    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed)
        .is_err()
    {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    if !user.is_active {
        return Err(error_response(StatusCode::FORBIDDEN, "Account is disabled"));
    }

    info!("login for {}", user.email);
    issue_token(&state, jar, user.id, user.email)
}

/// Current authenticated user, from the validated token
pub async fn me(
    axum::Extension(user): axum::Extension<AuthUser>,
) -> Json<AuthUser> {
    Json(user)
}

fn issue_token(
    state: &AppState,
    jar: CookieJar,
    user_id: uuid::Uuid,
    email: String,
) -> AuthResult {
    let token = state
        .jwt_service
        .create_token(user_id, email.clone())
        .map_err(|e| {
            warn!("token issuance failed: {e:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to issue token")
        })?;

    // Cookie lifetime mirrors the token's configured TTL.
    let cookie = Cookie::build(("access_token", token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(
            state.jwt_service.token_ttl().num_seconds(),
        ))
        .build();

    Ok((
        jar.add(cookie),
        Json(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            user_id,
            email,
        }),
    ))
}

/// Create the auth routes. `/me` sits behind the token middleware; the
/// register/login pair stays open.
pub fn create_routes(jwt_service: std::sync::Arc<crate::auth::jwt::JwtService>) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/v1/auth/me", get(me))
        .layer(axum::middleware::from_fn_with_state(
            jwt_service,
            crate::auth::middleware::AuthMiddleware::validate_token,
        ));

    Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .merge(protected)
}
