//! Engine configuration.

use serde::{Deserialize, Serialize};

use orderkit_observability::{LogConfig, LogFormat};

pub const DEFAULT_IDEMPOTENCY_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lifetime of transient free-item deduction keys.
    pub idempotency_ttl_secs: u64,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idempotency_ttl_secs: DEFAULT_IDEMPOTENCY_TTL_SECS,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl EngineConfig {
    /// Read `ORDERKIT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let idempotency_ttl_secs = match lookup("ORDERKIT_IDEMPOTENCY_TTL_SECS") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid ORDERKIT_IDEMPOTENCY_TTL_SECS; using default");
                defaults.idempotency_ttl_secs
            }),
            None => defaults.idempotency_ttl_secs,
        };

        let log_level = lookup("ORDERKIT_LOG_LEVEL").unwrap_or(defaults.log_level);

        let log_format = match lookup("ORDERKIT_LOG_FORMAT") {
            Some(raw) => raw.parse().unwrap_or_else(|err: String| {
                tracing::warn!(error = %err, "invalid ORDERKIT_LOG_FORMAT; using default");
                defaults.log_format
            }),
            None => defaults.log_format,
        };

        Self {
            idempotency_ttl_secs,
            log_level,
            log_format,
        }
    }

    pub fn idempotency_ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.idempotency_ttl_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        chrono::Duration::seconds(secs)
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            format: self.log_format,
        }
    }

    /// Install the tracing subscriber described by this configuration.
    pub fn init_logging(&self) {
        orderkit_observability::init_with(&self.log_config());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        assert_eq!(EngineConfig::from_lookup(lookup(&[])), EngineConfig::default());
        assert_eq!(EngineConfig::default().idempotency_ttl(), chrono::Duration::minutes(5));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("ORDERKIT_IDEMPOTENCY_TTL_SECS", "60"),
            ("ORDERKIT_LOG_LEVEL", "debug"),
            ("ORDERKIT_LOG_FORMAT", "pretty"),
        ]));
        assert_eq!(config.idempotency_ttl_secs, 60);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("ORDERKIT_IDEMPOTENCY_TTL_SECS", "soon"),
            ("ORDERKIT_LOG_FORMAT", "xml"),
        ]));
        assert_eq!(config.idempotency_ttl_secs, DEFAULT_IDEMPOTENCY_TTL_SECS);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn json_fills_missing_fields() {
        let config = EngineConfig::from_json(r#"{"idempotency_ttl_secs": 30}"#).unwrap();
        assert_eq!(config.idempotency_ttl_secs, 30);
        assert_eq!(config.log_level, "info");
    }
}
