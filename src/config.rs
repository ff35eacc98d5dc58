use std::env;
use std::str::FromStr;

/// Seconds in a day; the default token lifetime.
const DEFAULT_JWT_EXPIRATION_SECS: i64 = 86_400;
/// Mirrors bcrypt's private cost bounds (bcrypt 0.15: MIN_COST = 4, MAX_COST = 31).
const BCRYPT_MIN_COST: u32 = 4;
const BCRYPT_MAX_COST: u32 = 31;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Process configuration, read once at startup and passed to the components
/// that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` runs the server on the in-memory store.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: i64,
    pub bcrypt_cost: u32,
}

fn optional(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = optional("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration_secs = parsed("JWT_EXPIRATION_SECS", DEFAULT_JWT_EXPIRATION_SECS)?;
        if jwt_expiration_secs <= 0 {
            return Err(ConfigError::Invalid {
                key: "JWT_EXPIRATION_SECS",
                reason: "must be positive".into(),
            });
        }

        let bcrypt_cost = parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                reason: format!(
                    "must be between {} and {}",
                    BCRYPT_MIN_COST,
                    BCRYPT_MAX_COST
                ),
            });
        }

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            server_port: parsed("SERVER_PORT", 8080)?,
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            jwt_expiration_secs,
            bcrypt_cost,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.jwt_expiration_secs)
    }
}
