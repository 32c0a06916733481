use std::{net::SocketAddr, time::Duration};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub jwt: JwtConfig,
    pub cookie_secure: bool,
    pub request_timeout: Duration,
    /// Argon2 runs allowed at the same time.
    pub hash_concurrency: usize,
    pub static_dir: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if secret.trim().is_empty() {
            return Err(ConfigError::Empty("JWT_SECRET"));
        }

        let jwt = JwtConfig {
            secret: SecretString::new(secret),
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "guestlist".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "guestlist-web".into()),
            ttl_hours: parse_or(&lookup, "JWT_TTL_HOURS", 24)?,
        };
        if jwt.ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "JWT_TTL_HOURS",
                value: jwt.ttl_hours.to_string(),
            });
        }

        let hash_concurrency: usize = parse_or(&lookup, "HASH_CONCURRENCY", 4)?;
        if hash_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "HASH_CONCURRENCY",
                value: "0".into(),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            db_acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            jwt,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
            hash_concurrency,
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "static".into()),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 8081)?,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Secrets shorter than this are accepted but reported at startup.
    pub fn has_weak_secret(&self) -> bool {
        self.jwt.secret.expose_secret().len() < 32
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
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
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.jwt.ttl_hours, 24);
        assert_eq!(cfg.jwt.issuer, "guestlist");
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.hash_concurrency, 4);
        assert!(cfg.has_weak_secret());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn blank_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Empty("JWT_SECRET")));
    }

    #[test]
    fn invalid_numbers_are_reported_with_their_key() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "x"),
            ("APP_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn debug_output_does_not_contain_the_secret() {
        let cfg = AppConfig::from_lookup(lookup_from(&[(
            "JWT_SECRET",
            "do-not-print-me-0123456789abcdef",
        )]))
        .unwrap();
        assert!(!format!("{cfg:?}").contains("do-not-print-me"));
        assert!(!cfg.has_weak_secret());
    }

    #[test]
    fn empty_database_url_means_in_memory() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "x"),
            ("DATABASE_URL", ""),
        ]))
        .unwrap();
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn zero_hash_concurrency_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "x"),
            ("HASH_CONCURRENCY", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "HASH_CONCURRENCY", .. }));
    }
}
