//! Runtime configuration for the pipeline and its logging.
//!
//! # Responsibility
//! - Describe tunable pipeline policies and logging settings.
//! - Load them from an already-parsed JSON value, a JSON string or the
//!   process environment.
//!
//! # Invariants
//! - Every source is validated against one schema; all violations are
//!   reported together.
//! - Missing settings fall back to `ConnectConfig::default()`.

use crate::locale::LocaleTag;
use crate::logging::LoggingConfig;
use crate::validation::assert::StringEnum;
use crate::validation::pattern::LOCALE_TAG;
use crate::validation::schema::{optional, Rule, Schema};
use crate::validation::violation::{FieldPath, ValidationError, ValidationResult, Violation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "CONNECT_LOG_LEVEL";
/// Environment variable enabling file logging in an absolute directory.
pub const ENV_LOG_DIR: &str = "CONNECT_LOG_DIR";
/// Environment variable selecting `lenient` or `strict` response defaults.
pub const ENV_RESPONSE_DEFAULTS: &str = "CONNECT_RESPONSE_DEFAULTS";
/// Environment variable selecting `count` or `ignore` for zero charges.
pub const ENV_ZERO_CHARGE_CURRENCY: &str = "CONNECT_ZERO_CHARGE_CURRENCY";
/// Environment variable setting the default locale.
pub const ENV_DEFAULT_LOCALE: &str = "CONNECT_DEFAULT_LOCALE";

/// How omitted response fields are treated after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDefaults {
    /// Backfill omitted fields from the request (e.g. missing cancellation
    /// outcomes mean every cancellation succeeded).
    #[default]
    Lenient,
    /// Omitted fields are validated as-is and fail the invocation.
    Strict,
}

impl StringEnum for ResponseDefaults {
    const VARIANTS: &'static [Self] = &[Self::Lenient, Self::Strict];

    fn as_str(self) -> &'static str {
        match self {
            Self::Lenient => "lenient",
            Self::Strict => "strict",
        }
    }
}

/// Whether zero-valued charges take part in currency-mismatch detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroChargeCurrency {
    #[default]
    Count,
    Ignore,
}

impl StringEnum for ZeroChargeCurrency {
    const VARIANTS: &'static [Self] = &[Self::Count, Self::Ignore];

    fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Ignore => "ignore",
        }
    }
}

/// Policies consulted while constructing entities and invoking capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelinePolicy {
    pub response_defaults: ResponseDefaults,
    pub zero_charge_currency: ZeroChargeCurrency,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectConfig {
    pub logging: LoggingConfig,
    pub policy: PipelinePolicy,
    pub default_locale: LocaleTag,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            policy: PipelinePolicy::default(),
            default_locale: LocaleTag::default(),
        }
    }
}

static CONFIG_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "connect configuration",
        Rule::object([
            optional(
                "logging",
                Rule::object([
                    optional(
                        "level",
                        Rule::enumeration(["trace", "debug", "info", "warn", "error"]),
                    ),
                    optional("directory", Rule::string()),
                ]),
            ),
            optional(
                "policy",
                Rule::object([
                    optional(
                        "responseDefaults",
                        Rule::enumeration(ResponseDefaults::wire_names()),
                    ),
                    optional(
                        "zeroChargeCurrency",
                        Rule::enumeration(ZeroChargeCurrency::wire_names()),
                    ),
                ]),
            ),
            optional("defaultLocale", Rule::string().pattern(&LOCALE_TAG)),
        ]),
    )
});

impl ConnectConfig {
    pub fn schema() -> &'static Schema {
        &CONFIG_SCHEMA
    }

    /// Validates and loads a configuration value.
    pub fn from_value(value: &Value) -> ValidationResult<Self> {
        CONFIG_SCHEMA.validate(value)?;
        serde_json::from_value(value.clone()).map_err(|err| {
            ValidationError::single(
                CONFIG_SCHEMA.label(),
                Violation::new(FieldPath::root(), err.to_string()),
            )
        })
    }

    pub fn from_json_str(raw: &str) -> ValidationResult<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|err| {
            ValidationError::single(
                CONFIG_SCHEMA.label(),
                Violation::new(FieldPath::root(), format!("is not valid JSON: {err}")),
            )
        })?;
        Self::from_value(&value)
    }

    /// Defaults overlaid with `CONNECT_*` environment variables.
    pub fn from_env() -> ValidationResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values produced by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ValidationResult<Self> {
        let mut logging = serde_json::Map::new();
        let mut policy = serde_json::Map::new();
        let mut root = serde_json::Map::new();

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            logging.insert("level".into(), Value::String(level.trim().to_ascii_lowercase()));
        }
        if let Some(directory) = lookup(ENV_LOG_DIR) {
            logging.insert("directory".into(), Value::String(directory));
        }
        if let Some(defaults) = lookup(ENV_RESPONSE_DEFAULTS) {
            policy.insert(
                "responseDefaults".into(),
                Value::String(defaults.trim().to_ascii_lowercase()),
            );
        }
        if let Some(zero) = lookup(ENV_ZERO_CHARGE_CURRENCY) {
            policy.insert(
                "zeroChargeCurrency".into(),
                Value::String(zero.trim().to_ascii_lowercase()),
            );
        }
        if let Some(locale) = lookup(ENV_DEFAULT_LOCALE) {
            root.insert("defaultLocale".into(), Value::String(locale.trim().to_string()));
        }
        if !logging.is_empty() {
            root.insert("logging".into(), Value::Object(logging));
        }
        if !policy.is_empty() {
            root.insert("policy".into(), Value::Object(policy));
        }
        Self::from_value(&Value::Object(root))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConnectConfig, ResponseDefaults, ZeroChargeCurrency, ENV_LOG_LEVEL, ENV_RESPONSE_DEFAULTS,
    };
    use serde_json::json;

    #[test]
    fn empty_value_yields_defaults() {
        let config = ConnectConfig::from_value(&json!({})).unwrap();
        assert_eq!(config, ConnectConfig::default());
        assert_eq!(config.policy.response_defaults, ResponseDefaults::Lenient);
        assert_eq!(config.policy.zero_charge_currency, ZeroChargeCurrency::Count);
        assert_eq!(config.default_locale.as_str(), "en-US");
    }

    #[test]
    fn parses_full_configuration() {
        let config = ConnectConfig::from_json_str(
            r#"{
                "logging": { "level": "warn", "directory": "/var/log/connect" },
                "policy": { "responseDefaults": "strict", "zeroChargeCurrency": "ignore" },
                "defaultLocale": "fr-CA"
            }"#,
        )
        .unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.directory.as_deref(), Some("/var/log/connect"));
        assert_eq!(config.policy.response_defaults, ResponseDefaults::Strict);
        assert_eq!(config.policy.zero_charge_currency, ZeroChargeCurrency::Ignore);
        assert_eq!(config.default_locale.as_str(), "fr-CA");
    }

    #[test]
    fn reports_every_invalid_setting() {
        let err = ConnectConfig::from_value(&json!({
            "logging": { "level": "loud" },
            "policy": { "responseDefaults": "sometimes" },
            "defaultLocale": "english",
            "extra": true
        }))
        .unwrap_err();
        assert_eq!(err.len(), 4, "{err}");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ConnectConfig::from_lookup(|key| match key {
            ENV_LOG_LEVEL => Some(" DEBUG ".to_string()),
            ENV_RESPONSE_DEFAULTS => Some("Strict".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.policy.response_defaults, ResponseDefaults::Strict);
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = ConnectConfig::from_json_str("{ not json").unwrap_err();
        assert!(err.to_string().contains("is not valid JSON"));
    }
}
