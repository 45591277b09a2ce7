use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Json, State},
    http::Request,
};
use axum_extra::TypedHeader;
use chrono::Duration;
use headers::{authorization::Bearer, Authorization};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_models::auth::{LoginRequest, LoginResponse, TokenResponse, ADMIN_ROLE};
use shared_models::error::AppError;
use shared_utils::extractor::extract_user;
use shared_utils::jwt::{issue_token, validate_token};

type HmacSha256 = Hmac<Sha256>;

// Compares two secrets without leaking the mismatch position through timing.
fn secrets_match(key: &str, expected: &str, candidate: &str) -> bool {
    let mac_of = |value: &str| {
        HmacSha256::new_from_slice(key.as_bytes()).map(|mut mac| {
            mac.update(value.as_bytes());
            mac
        })
    };

    match (mac_of(expected), mac_of(candidate)) {
        (Ok(expected), Ok(candidate)) => candidate
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}

pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if !config.is_admin_login_enabled() {
        warn!("Login attempt while ADMIN_PASSWORD is unset");
        return Err(AppError::Forbidden("Admin login is disabled".to_string()));
    }

    // Both checks always run
    let username_ok = secrets_match(&config.secret_key, &config.admin_username, &request.username);
    let password_ok = secrets_match(&config.secret_key, &config.admin_password, &request.password);
    if !(username_ok && password_ok) {
        warn!("Rejected admin login for {:?}", request.username);
        return Err(AppError::Auth("Invalid username or password".to_string()));
    }

    let ttl = Duration::hours(config.admin_token_ttl_hours);
    let access_token = issue_token(&config.admin_username, ADMIN_ROLE, &config.secret_key, ttl)
        .map_err(AppError::Internal)?;

    info!("Admin {} logged in", config.admin_username);

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: ttl.num_seconds(),
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Json<Value> {
    debug!("Verifying token");

    let valid = bearer
        .map(|TypedHeader(auth)| validate_token(auth.token(), &config.secret_key).is_ok())
        .unwrap_or(false);

    Json(json!({ "valid": valid }))
}

pub async fn me(request: Request<Body>) -> Result<Json<TokenResponse>, AppError> {
    let user = extract_user(&request)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        role: user.role,
    }))
}
