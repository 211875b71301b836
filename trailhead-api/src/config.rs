/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `APP_ENV`: `development` (default) or `production`
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 3000)
/// - `STORAGE_BACKEND`: `postgres` (default) or `memory`
/// - `DATABASE_URL`: PostgreSQL connection string (required for postgres)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 chars)
/// - `JWT_EXPIRES_IN_DAYS`: Token lifetime (default: 90)
/// - `JWT_COOKIE_EXPIRES_IN_DAYS`: Cookie lifetime (default: 90)
/// - `PAYMENT_API_URL`: Payment provider base URL
/// - `PAYMENT_ACCESS_TOKEN`: Payment provider access token
/// - `MAIL_FROM`: Sender address for outgoing mail
///
/// # Example
///
/// ```no_run
/// use trailhead_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub env: AppEnv,

    /// API server configuration
    pub api: ApiConfig,

    /// Which store backend to run against
    pub storage: StorageBackend,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    pub payments: PaymentsConfig,

    pub mail: MailConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; empty with the memory backend
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub expires_in_days: i64,

    pub cookie_expires_in_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    pub api_url: String,

    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub from: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from any variable source
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let app_env = match get("APP_ENV", "development").as_str() {
            "production" => AppEnv::Production,
            "development" => AppEnv::Development,
            other => anyhow::bail!("APP_ENV must be development or production, got {other}"),
        };

        let storage = match get("STORAGE_BACKEND", "postgres").as_str() {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => anyhow::bail!("STORAGE_BACKEND must be postgres or memory, got {other}"),
        };

        let api_port = get("API_PORT", "3000").parse::<u16>()?;

        let database_url = match (storage, var("DATABASE_URL")) {
            (_, Some(url)) => url,
            (StorageBackend::Memory, None) => String::new(),
            (StorageBackend::Postgres, None) => {
                anyhow::bail!("DATABASE_URL environment variable is required")
            }
        };

        let max_connections = get("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()?;

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        Ok(Self {
            env: app_env,
            api: ApiConfig {
                host: get("API_HOST", "0.0.0.0"),
                port: api_port,
            },
            storage,
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in_days: get("JWT_EXPIRES_IN_DAYS", "90").parse()?,
                cookie_expires_in_days: get("JWT_COOKIE_EXPIRES_IN_DAYS", "90").parse()?,
            },
            payments: PaymentsConfig {
                api_url: get("PAYMENT_API_URL", "https://api.mercadopago.com"),
                access_token: get("PAYMENT_ACCESS_TOKEN", ""),
            },
            mail: MailConfig {
                from: get("MAIL_FROM", "Trailhead <noreply@trailhead.dev>"),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgresql://localhost/test"), ("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.env, AppEnv::Development);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.jwt.expires_in_days, 90);
        assert!(!config.is_production());
    }

    #[test]
    fn test_memory_backend_needs_no_database_url() {
        let config = load(&[("STORAGE_BACKEND", "memory"), ("JWT_SECRET", SECRET)]).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.database.url.is_empty());
    }

    #[test]
    fn test_postgres_backend_requires_database_url() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let result = load(&[("STORAGE_BACKEND", "memory"), ("JWT_SECRET", "short")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_env_is_rejected() {
        let result = load(&[
            ("STORAGE_BACKEND", "memory"),
            ("JWT_SECRET", SECRET),
            ("APP_ENV", "staging"),
        ]);
        assert!(result.is_err());
    }
}
