use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, ADMIN_ROLE};

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_path: String,
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            database_path: "clinic-test.db".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "test-admin-password".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_database(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        let mut config = AppConfig::with_database(self.database_path.clone());
        config.secret_key = self.jwt_secret.clone();
        config.admin_username = self.admin_username.clone();
        config.admin_password = self.admin_password.clone();
        config
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::staff()
    }
}

impl TestUser {
    pub fn new(role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: role.to_string(),
        }
    }

    pub fn admin() -> Self {
        Self::new(ADMIN_ROLE)
    }

    pub fn staff() -> Self {
        Self::new("staff")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn admin_bearer(config: &TestConfig) -> String {
        format!(
            "Bearer {}",
            Self::create_test_token(&TestUser::admin(), &config.jwt_secret, None)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::with_database("/tmp/clinic.db");
        let app_config = config.to_app_config();

        assert_eq!(app_config.database_path, "/tmp/clinic.db");
        assert_eq!(app_config.secret_key, config.jwt_secret);
        assert!(app_config.is_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::admin();
        let user_model = user.to_user();

        assert!(user_model.is_admin());
        assert_eq!(user_model.id, user.id);
        assert!(!TestUser::staff().to_user().is_admin());
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
        assert!(crate::jwt::validate_token(&token, "test-secret").is_ok());
        assert!(crate::jwt::validate_token(
            &JwtTestUtils::create_invalid_signature_token(&user),
            "test-secret"
        )
        .is_err());
    }
}
