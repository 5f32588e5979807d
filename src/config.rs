//! Application configuration
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Rocket's own settings (`ROCKET_PORT`, `ROCKET_ADDRESS`, ...) are read
//! by Rocket itself; only the secret key is forwarded explicitly.

use std::env;

use rocket::config::SecretKey;
use rocket::figment::Figment;

use crate::error::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "app.db";
pub const DEFAULT_POOL_SIZE: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite file path, optionally prefixed with `sqlite://`
    pub database_url: String,
    /// Forwarded to Rocket's `secret_key` when set
    pub secret_key: Option<String>,
    pub pool_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            secret_key: None,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl Config {
    /// Load from `.env` (if present) and the environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let secret_key = lookup("SECRET_KEY").filter(|key| !key.is_empty());
        if let Some(key) = &secret_key {
            check_secret_key(key)?;
        }

        let pool_size = match lookup("DATABASE_POOL_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "DATABASE_POOL_SIZE must be a positive integer, got {:?}",
                        raw
                    ))
                })?,
            None => DEFAULT_POOL_SIZE,
        };

        Ok(Self {
            database_url,
            secret_key,
            pool_size,
        })
    }

    /// Path handed to the SQLite driver.
    pub fn database_path(&self) -> &str {
        self.database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))
            .unwrap_or(&self.database_url)
    }

    pub fn figment(&self) -> Figment {
        let figment = rocket::Config::figment();
        match &self.secret_key {
            Some(key) => figment.merge(("secret_key", key.as_str())),
            None => figment,
        }
    }
}

/// Parse the key the way Rocket will at launch, so a bad key is reported
/// while reading the configuration.
fn check_secret_key(key: &str) -> Result<()> {
    Figment::new()
        .merge(("secret_key", key))
        .extract_inner::<SecretKey>("secret_key")
        .map(drop)
        .map_err(|e| {
            Error::Config(format!(
                "SECRET_KEY must be 256 or 512 bits as base64 (44 or 88 characters) \
                 or hex (64 characters), e.g. from `openssl rand -base64 32`: {}",
                e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database_path(), "app.db");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite:///var/lib/testers.db"),
            ("SECRET_KEY", "hPRYyVRiMyxpw5sBB1XeCMN1kFsDCqKvBi2QJxBVHQk="),
            ("DATABASE_POOL_SIZE", "2"),
        ]))
        .unwrap();

        assert_eq!(config.database_path(), "/var/lib/testers.db");
        assert!(config.secret_key.is_some());
        assert_eq!(config.pool_size, 2);
    }

    #[test]
    fn rejects_bad_pool_size() {
        let result = Config::from_lookup(lookup_from(&[("DATABASE_POOL_SIZE", "zero")]));
        assert!(matches!(result, Err(Error::Config(_))));

        let result = Config::from_lookup(lookup_from(&[("DATABASE_POOL_SIZE", "0")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_secret_key_rocket_cannot_use() {
        let result = Config::from_lookup(lookup_from(&[("SECRET_KEY", "devPass")]));
        match result {
            Err(Error::Config(message)) => {
                assert!(message.contains("SECRET_KEY"), "{}", message)
            }
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn secret_key_reaches_rocket_figment() {
        let config = Config {
            secret_key: Some("hPRYyVRiMyxpw5sBB1XeCMN1kFsDCqKvBi2QJxBVHQk=".into()),
            ..Config::default()
        };
        let key: String = config.figment().extract_inner("secret_key").unwrap();
        assert_eq!(key, "hPRYyVRiMyxpw5sBB1XeCMN1kFsDCqKvBi2QJxBVHQk=");
    }
}
