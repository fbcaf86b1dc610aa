//! Engine configuration loaded from the environment

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_FILTER: &str = "info,order_engine=debug";

/// Order engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// PostgreSQL URL; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Pool size for the PostgreSQL store
    pub max_connections: u32,

    /// `tracing_subscriber` filter directive
    pub log_filter: String,

    /// Append domain events to the journal alongside row changes
    pub record_events: bool,
}

impl EngineConfig {
    /// Read `DATABASE_URL`, `ORDER_ENGINE_MAX_CONNECTIONS`, `RUST_LOG` and
    /// `ORDER_ENGINE_RECORD_EVENTS`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            config.database_url = Some(url);
        }
        if let Some(raw) = lookup("ORDER_ENGINE_MAX_CONNECTIONS") {
            config.max_connections = raw
                .trim()
                .parse()
                .with_context(|| format!("ORDER_ENGINE_MAX_CONNECTIONS is not a number: {:?}", raw))?;
            if config.max_connections == 0 {
                anyhow::bail!("ORDER_ENGINE_MAX_CONNECTIONS must be at least 1");
            }
        }
        if let Some(filter) = lookup("RUST_LOG") {
            config.log_filter = filter;
        }
        if let Some(raw) = lookup("ORDER_ENGINE_RECORD_EVENTS") {
            config.record_events = parse_flag(&raw)
                .with_context(|| format!("ORDER_ENGINE_RECORD_EVENTS is not a boolean: {:?}", raw))?;
        }

        Ok(config)
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            record_events: true,
        }
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized flag value {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<EngineConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_connections, 5);
        assert!(config.record_events);
        assert_eq!(config.log_filter, "info,order_engine=debug");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("ORDER_ENGINE_MAX_CONNECTIONS", "12"),
            ("RUST_LOG", "warn"),
            ("ORDER_ENGINE_RECORD_EVENTS", "off"),
        ])
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/orders"));
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.log_filter, "warn");
        assert!(!config.record_events);
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = load(&[("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(load(&[("ORDER_ENGINE_MAX_CONNECTIONS", "many")]).is_err());
        assert!(load(&[("ORDER_ENGINE_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("ORDER_ENGINE_RECORD_EVENTS", "maybe")]).is_err());
    }

    #[test]
    fn test_with_database_url() {
        let config = EngineConfig::default().with_database_url("postgres://db/orders");
        assert_eq!(config.database_url.as_deref(), Some("postgres://db/orders"));
    }
}
