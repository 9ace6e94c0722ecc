// src/shared/database/config.rs

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("DATABASE_MIN_CONNECTIONS ({min}) exceeds DATABASE_MAX_CONNECTIONS ({max})")]
    PoolBounds { min: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub sqlx_logging: bool,
    /// Upper bound on a single repository operation. `None` waits indefinitely.
    pub statement_deadline: Option<Duration>,
}

impl DatabaseConfig {
    /// Loads `.env.{RUST_ENV}` (falling back to `.env`) and reads the process
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rust_env = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());

        let env_file = format!(".env.{}", rust_env);
        if dotenvy::from_filename(&env_file).is_err() {
            dotenvy::dotenv().ok();
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 50u32)?;
        let min_connections = parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 10u32)?;

        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }
        if min_connections > max_connections {
            return Err(ConfigError::PoolBounds {
                min: min_connections,
                max: max_connections,
            });
        }

        let statement_deadline = parse_optional::<u64, _>(&lookup, "DATABASE_STATEMENT_DEADLINE_MS")?
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        Ok(Self {
            url,
            max_connections,
            min_connections,
            connect_timeout: secs(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS", 5)?,
            acquire_timeout: secs(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?,
            idle_timeout: secs(&lookup, "DATABASE_IDLE_TIMEOUT_SECS", 300)?,
            max_lifetime: secs(&lookup, "DATABASE_MAX_LIFETIME_SECS", 1800)?,
            sqlx_logging: parse_or(&lookup, "DATABASE_SQLX_LOGGING", false)?,
            statement_deadline,
        })
    }

    pub fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.url.clone());
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(self.connect_timeout)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .sqlx_logging(self.sqlx_logging);
        opt
    }

    pub async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        info!(
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            "connecting to database"
        );
        Database::connect(self.connect_options()).await
    }
}

fn parse_optional<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn secs<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            DatabaseConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/db")]))
                .unwrap();

        assert_eq!(config.url, "postgres://localhost/db");
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.min_connections, 10);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.max_lifetime, Duration::from_secs(1800));
        assert!(!config.sqlx_logging);
        assert_eq!(config.statement_deadline, None);
    }

    #[test]
    fn test_overrides() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("DATABASE_MAX_CONNECTIONS", "8"),
            ("DATABASE_MIN_CONNECTIONS", "2"),
            ("DATABASE_IDLE_TIMEOUT_SECS", "60"),
            ("DATABASE_SQLX_LOGGING", "true"),
            ("DATABASE_STATEMENT_DEADLINE_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 8);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert!(config.sqlx_logging);
        assert_eq!(config.statement_deadline, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_zero_deadline_disables_it() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("DATABASE_STATEMENT_DEADLINE_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.statement_deadline, None);
    }

    #[test]
    fn test_missing_url() {
        assert_eq!(
            DatabaseConfig::from_lookup(lookup_from(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
        assert_eq!(
            DatabaseConfig::from_lookup(lookup_from(&[("DATABASE_URL", "  ")])),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn test_invalid_number() {
        let err = DatabaseConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn test_pool_bounds() {
        let err = DatabaseConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("DATABASE_MIN_CONNECTIONS", "5"),
        ]))
        .unwrap_err();

        assert_eq!(err, ConfigError::PoolBounds { min: 5, max: 4 });
    }

    #[test]
    fn test_connect_options_carry_pool_settings() {
        let config =
            DatabaseConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://db")])).unwrap();
        let opt = config.connect_options();

        assert_eq!(opt.get_url(), "postgres://db");
        assert_eq!(opt.get_max_connections(), Some(50));
        assert_eq!(opt.get_min_connections(), Some(10));
    }
}
