use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_value = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

// Validates the bearer token and stores the resulting `User` in request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;

    let user = validate_token(token, &config.secret_key).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Same as [`auth_middleware`] but only lets admin tokens through.
pub async fn admin_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;

    let user = validate_token(token, &config.secret_key).map_err(AppError::Auth)?;
    if !user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn extract_user<B>(request: &Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    use crate::test_utils::{JwtTestUtils, TestConfig, TestUser};

    fn protected_app(config: Arc<AppConfig>) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(config, admin_middleware))
    }

    async fn status_for(token: Option<String>) -> StatusCode {
        let config = TestConfig::default();
        let app = protected_app(config.to_arc());

        let mut builder = Request::builder().uri("/");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_admin_middleware_accepts_admin() {
        let config = TestConfig::default();
        let token = JwtTestUtils::create_test_token(&TestUser::admin(), &config.jwt_secret, None);
        assert_eq!(status_for(Some(token)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_middleware_rejects_missing_token() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_middleware_rejects_non_admin() {
        let config = TestConfig::default();
        let token = JwtTestUtils::create_test_token(&TestUser::staff(), &config.jwt_secret, None);
        assert_eq!(status_for(Some(token)).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_middleware_rejects_expired_token() {
        let config = TestConfig::default();
        let token = JwtTestUtils::create_expired_token(&TestUser::admin(), &config.jwt_secret);
        assert_eq!(status_for(Some(token)).await, StatusCode::UNAUTHORIZED);
    }
}
