//! Coordinator configuration.
//!
//! [`CoordinatorConfig`] deserializes with per-field defaults, so a partial
//! document is enough. [`CoordinatorConfig::from_env`] overlays the
//! `FOREMAN_*` environment variables on the defaults:
//!
//! | Variable | Field |
//! |---|---|
//! | `FOREMAN_SOURCE` | `source` |
//! | `FOREMAN_MAX_RETRIES` | `engine.retry.max_retries` |
//! | `FOREMAN_BASE_DELAY_MS` | `engine.retry.base_delay_ms` |
//! | `FOREMAN_MAX_DELAY_MS` | `engine.retry.max_delay_ms` |
//! | `FOREMAN_MAX_JITTER_MS` | `engine.retry.max_jitter_ms` |
//! | `FOREMAN_PRIORITY_ORDER` | `engine.priority_order` |
//! | `FOREMAN_LEDGER_RETENTION_HOURS` | `ledger_retention_hours` |
//! | `FOREMAN_DAILY_BUDGET` | `daily_budget` |
//! | `FOREMAN_DISABLED_PROVIDERS` | `routing.disabled_providers` (comma separated) |
//! | `FOREMAN_DATABASE_URL` | `database_url` |

use crate::envelope::SourceName;
use crate::lifecycle::domain::{ExecutionProvider, PriorityOrder};
use crate::lifecycle::services::EngineSettings;
use crate::routing::RoutingConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_SOURCE: &str = "foreman";
const DEFAULT_LEDGER_RETENTION_HOURS: u32 = 168;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing configuration value {0}")]
    Missing(&'static str),

    /// A setting could not be parsed or is out of range.
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Variable or field name.
        key: &'static str,
        /// Rejected value.
        value: String,
        /// Parser explanation.
        reason: String,
    },
}

/// Everything the coordinator reads at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Source name stamped on every outbound envelope.
    #[serde(default = "default_source")]
    pub source: String,
    /// Lifecycle engine tunables.
    #[serde(default)]
    pub engine: EngineSettings,
    /// Routing table settings.
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Hours an idempotency entry is kept.
    #[serde(default = "default_ledger_retention_hours")]
    pub ledger_retention_hours: u32,
    /// Daily spend limit; no budget alerts when absent.
    #[serde(default)]
    pub daily_budget: Option<Decimal>,
    /// `PostgreSQL` connection string for the durable ledger.
    #[serde(default)]
    pub database_url: Option<String>,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_owned()
}

const fn default_ledger_retention_hours() -> u32 {
    DEFAULT_LEDGER_RETENTION_HOURS
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            engine: EngineSettings::default(),
            routing: RoutingConfig::default(),
            ledger_retention_hours: DEFAULT_LEDGER_RETENTION_HOURS,
            daily_budget: None,
            database_url: None,
        }
    }
}

impl CoordinatorConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but cannot
    /// be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        if let Some(source) = read("FOREMAN_SOURCE") {
            config.source = source;
        }
        let retry = &mut config.engine.retry;
        if let Some(value) = read("FOREMAN_MAX_RETRIES") {
            retry.max_retries = parse("FOREMAN_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read("FOREMAN_BASE_DELAY_MS") {
            retry.base_delay_ms = parse("FOREMAN_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read("FOREMAN_MAX_DELAY_MS") {
            retry.max_delay_ms = parse("FOREMAN_MAX_DELAY_MS", &value)?;
        }
        if let Some(value) = read("FOREMAN_MAX_JITTER_MS") {
            retry.max_jitter_ms = parse("FOREMAN_MAX_JITTER_MS", &value)?;
        }
        if let Some(value) = read("FOREMAN_PRIORITY_ORDER") {
            config.engine.priority_order = PriorityOrder::try_from(value.as_str())
                .map_err(|err| invalid("FOREMAN_PRIORITY_ORDER", &value, err))?;
        }
        if let Some(value) = read("FOREMAN_LEDGER_RETENTION_HOURS") {
            config.ledger_retention_hours = parse("FOREMAN_LEDGER_RETENTION_HOURS", &value)?;
        }
        if let Some(value) = read("FOREMAN_DAILY_BUDGET") {
            config.daily_budget = Some(parse("FOREMAN_DAILY_BUDGET", &value)?);
        }
        if let Some(value) = read("FOREMAN_DISABLED_PROVIDERS") {
            config.routing.disabled_providers = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    ExecutionProvider::try_from(name)
                        .map_err(|err| invalid("FOREMAN_DISABLED_PROVIDERS", name, err))
                })
                .collect::<Result<_, _>>()?;
        }
        config.database_url = read("FOREMAN_DATABASE_URL");

        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialization alone cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unusable source name, an
    /// inverted delay range, a zero retention horizon or a non-positive
    /// budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source_name()?;
        let retry = &self.engine.retry;
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err(ConfigError::Invalid {
                key: "max_delay_ms",
                value: retry.max_delay_ms.to_string(),
                reason: format!("must not be below base_delay_ms {}", retry.base_delay_ms),
            });
        }
        if self.ledger_retention_hours == 0 {
            return Err(ConfigError::Invalid {
                key: "ledger_retention_hours",
                value: "0".to_owned(),
                reason: "must be positive".to_owned(),
            });
        }
        match self.daily_budget {
            Some(budget) if budget <= Decimal::ZERO => Err(ConfigError::Invalid {
                key: "daily_budget",
                value: budget.to_string(),
                reason: "must be positive".to_owned(),
            }),
            _ => Ok(()),
        }
    }

    /// Returns the database URL required by the durable ledger.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when no URL is configured.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("FOREMAN_DATABASE_URL"))
    }

    /// Returns the validated source name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the name is empty or too long.
    pub fn source_name(&self) -> Result<SourceName, ConfigError> {
        SourceName::new(self.source.clone()).map_err(|err| invalid("source", &self.source, err))
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err| invalid(key, value, err))
}

fn invalid(key: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::{BTreeSet, HashMap};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[rstest]
    fn empty_environment_yields_defaults() {
        let config = CoordinatorConfig::from_lookup(lookup(&[])).expect("defaults are valid");

        assert_eq!(config, CoordinatorConfig::default());
        assert_eq!(config.ledger_retention_hours, 168);
        assert_eq!(config.engine.retry.max_retries, 3);
    }

    #[rstest]
    fn variables_override_defaults() {
        let config = CoordinatorConfig::from_lookup(lookup(&[
            ("FOREMAN_SOURCE", "foreman-eu"),
            ("FOREMAN_MAX_RETRIES", "5"),
            ("FOREMAN_PRIORITY_ORDER", "higher_first"),
            ("FOREMAN_DAILY_BUDGET", "250.50"),
            ("FOREMAN_DISABLED_PROVIDERS", "human, gemini"),
            ("FOREMAN_DATABASE_URL", "postgres://localhost/foreman"),
        ]))
        .expect("configuration should parse");

        assert_eq!(config.source, "foreman-eu");
        assert_eq!(config.engine.retry.max_retries, 5);
        assert_eq!(config.engine.priority_order, PriorityOrder::HigherFirst);
        assert_eq!(config.daily_budget, Some(Decimal::new(25_050, 2)));
        assert_eq!(
            config.routing.disabled_providers,
            BTreeSet::from([ExecutionProvider::Human, ExecutionProvider::Gemini])
        );
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/foreman")
        );
    }

    #[rstest]
    #[case("FOREMAN_MAX_RETRIES", "three")]
    #[case("FOREMAN_DISABLED_PROVIDERS", "Copilot")]
    #[case("FOREMAN_DAILY_BUDGET", "-5")]
    #[case("FOREMAN_LEDGER_RETENTION_HOURS", "0")]
    #[case("FOREMAN_BASE_DELAY_MS", "99999999")]
    fn unusable_values_are_rejected(#[case] key: &str, #[case] value: &str) {
        let result = CoordinatorConfig::from_lookup(lookup(&[(key, value)]));

        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[rstest]
    fn durable_ledger_requires_a_database_url() {
        let config = CoordinatorConfig::default();

        assert_eq!(
            config.require_database_url(),
            Err(ConfigError::Missing("FOREMAN_DATABASE_URL"))
        );
    }

    #[rstest]
    fn partial_document_uses_field_defaults() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{"engine": {"retry": {"max_retries": 1}}}"#)
                .expect("document should deserialize");

        assert_eq!(config.engine.retry.max_retries, 1);
        assert_eq!(config.engine.retry.base_delay_ms, 5_000);
        assert_eq!(config.source, "foreman");
    }
}
