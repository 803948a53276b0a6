use anyhow::{Context, Result};

use crate::applications::store::DuplicateMatch;

const DEFAULT_EMBEDDED_DATABASE_URL: &str = "sqlite://applications.db?mode=rwc";

/// Application configuration loaded from environment variables.
/// Every variable has a default, so the service starts on a bare machine
/// against the embedded database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Preferred store. When unset or unusable, the embedded database is used.
    pub database_url: Option<String>,
    pub embedded_database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub duplicate_match: DuplicateMatch,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url: get("DATABASE_URL"),
            embedded_database_url: get("EMBEDDED_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_EMBEDDED_DATABASE_URL.to_string()),
            max_connections: get("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            acquire_timeout_secs: get("DB_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or_else(|| "5".to_string())
                .parse::<u64>()
                .context("DB_ACQUIRE_TIMEOUT_SECS must be a whole number of seconds")?,
            duplicate_match: match get("DUPLICATE_MATCH") {
                Some(raw) => raw.parse::<DuplicateMatch>().with_context(|| {
                    format!("DUPLICATE_MATCH must be 'exact' or 'case_insensitive', got '{raw}'")
                })?,
                None => DuplicateMatch::default(),
            },
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.embedded_database_url, DEFAULT_EMBEDDED_DATABASE_URL);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.duplicate_match, DuplicateMatch::Exact);
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_blank_database_url_is_unset() {
        let config = config_from(&[("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://tracker@localhost/tracker"),
            ("DUPLICATE_MATCH", "case_insensitive"),
            ("PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://tracker@localhost/tracker")
        );
        assert_eq!(config.duplicate_match, DuplicateMatch::CaseInsensitive);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config_from(&[("PORT", "not-a-port")]).is_err());
        assert!(config_from(&[("DUPLICATE_MATCH", "fuzzy")]).is_err());
    }
}
