use std::env;
use tracing::warn;

pub const DEFAULT_DATABASE_PATH: &str = "clinic.db";
pub const DEFAULT_SECRET_KEY: &str = "change-me-please";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DURATION_MINUTES: i64 = 30;
pub const DEFAULT_ADMIN_TOKEN_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub secret_key: String,
    pub admin_username: String,
    pub admin_password: String,
    pub bind_addr: String,
    pub default_duration_minutes: i64,
    pub admin_token_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_path: env::var("DATABASE_URL")
                .map(|url| normalize_database_url(&url))
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using {}", DEFAULT_DATABASE_PATH);
                    DEFAULT_DATABASE_PATH.to_string()
                }),
            secret_key: env::var("SECRET_KEY")
                .unwrap_or_else(|_| {
                    warn!("SECRET_KEY not set, using insecure default");
                    DEFAULT_SECRET_KEY.to_string()
                }),
            admin_username: env::var("ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_PASSWORD not set, admin login disabled");
                    String::new()
                }),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            default_duration_minutes: parse_or(
                "DEFAULT_DURATION_MINUTES",
                DEFAULT_DURATION_MINUTES,
            ),
            admin_token_ttl_hours: parse_or(
                "ADMIN_TOKEN_TTL_HOURS",
                DEFAULT_ADMIN_TOKEN_TTL_HOURS,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Configuration pointing at `database_path` with every other field at its default.
    pub fn with_database(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            admin_username: "admin".to_string(),
            admin_password: String::new(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            admin_token_ttl_hours: DEFAULT_ADMIN_TOKEN_TTL_HOURS,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key != DEFAULT_SECRET_KEY
            && !self.secret_key.is_empty()
            && self.is_admin_login_enabled()
    }

    pub fn is_admin_login_enabled(&self) -> bool {
        !self.admin_username.is_empty() && !self.admin_password.is_empty()
    }
}

fn parse_or(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} is not a number ({:?}), using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

// Accepts both plain paths and the `sqlite:///clinic.db` form used by ORMs.
fn normalize_database_url(url: &str) -> String {
    let trimmed = url.trim();
    for prefix in ["sqlite:///", "sqlite://", "sqlite:"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_database_url() {
        assert_eq!(normalize_database_url("sqlite:///clinic.db"), "clinic.db");
        assert_eq!(normalize_database_url("sqlite://data/clinic.db"), "data/clinic.db");
        assert_eq!(normalize_database_url("/var/lib/clinic.db"), "/var/lib/clinic.db");
    }

    #[test]
    fn test_default_config_is_not_configured() {
        let config = AppConfig::with_database("clinic.db");
        assert!(!config.is_configured());
        assert!(!config.is_admin_login_enabled());
        assert_eq!(config.default_duration_minutes, 30);
    }

    #[test]
    fn test_configured_with_secret_and_password() {
        let mut config = AppConfig::with_database("clinic.db");
        config.secret_key = "a-real-secret".to_string();
        config.admin_password = "hunter2".to_string();
        assert!(config.is_configured());
    }
}
