//! Runtime configuration.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MODEL_DEPLOYMENT_NAME` | `gpt-4o` |
//! | `CLAIMCHECK_MAX_TOKENS` | `2000` |
//! | `CLAIMCHECK_TEMPERATURE` | `0.0` |
//! | `CLAIMCHECK_REQUEST_TIMEOUT` | `60s` |
//! | `CLAIMCHECK_CONCURRENCY` | `1` |
//! | `CLAIMCHECK_CACHE_POLICY_SUMMARIES` | `false` |
//! | `CLAIMCHECK_POLICY_CACHE_TTL` | `1h` |
//!
//! Durations use `humantime` syntax (`90s`, `2m`, `1h 30m`).

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::providers::CompletionConfig;

/// Errors from reading runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Knobs for one `claimcheck` process.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Settings passed with every completion request
    pub completion: CompletionConfig,

    /// Records evaluated at once by the batch driver
    pub concurrency: usize,

    /// Reuse policy summaries across records of a batch
    pub cache_policy_summaries: bool,

    /// How long a cached policy summary stays valid
    pub policy_cache_ttl: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            concurrency: 1,
            cache_policy_summaries: false,
            policy_cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl RuntimeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// anything unset or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(model) = get("MODEL_DEPLOYMENT_NAME") {
            config.completion.model = model;
        }
        if let Some(value) = get("CLAIMCHECK_MAX_TOKENS") {
            config.completion.max_tokens = parse("CLAIMCHECK_MAX_TOKENS", &value)?;
        }
        if let Some(value) = get("CLAIMCHECK_TEMPERATURE") {
            let temperature: f32 = parse("CLAIMCHECK_TEMPERATURE", &value)?;
            if !(0.0..=2.0).contains(&temperature) {
                return Err(invalid("CLAIMCHECK_TEMPERATURE", &value, "must be within 0.0..=2.0"));
            }
            config.completion.temperature = temperature;
        }
        if let Some(value) = get("CLAIMCHECK_REQUEST_TIMEOUT") {
            config.completion.timeout = parse_duration("CLAIMCHECK_REQUEST_TIMEOUT", &value)?;
        }
        if let Some(value) = get("CLAIMCHECK_CONCURRENCY") {
            let concurrency: usize = parse("CLAIMCHECK_CONCURRENCY", &value)?;
            if concurrency == 0 {
                return Err(invalid("CLAIMCHECK_CONCURRENCY", &value, "must be at least 1"));
            }
            config.concurrency = concurrency;
        }
        if let Some(value) = get("CLAIMCHECK_CACHE_POLICY_SUMMARIES") {
            config.cache_policy_summaries = parse_flag("CLAIMCHECK_CACHE_POLICY_SUMMARIES", &value)?;
        }
        if let Some(value) = get("CLAIMCHECK_POLICY_CACHE_TTL") {
            config.policy_cache_ttl = parse_duration("CLAIMCHECK_POLICY_CACHE_TTL", &value)?;
        }

        Ok(config)
    }

    /// Override the batch concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| invalid(var, value, e.to_string()))
}

fn parse_duration(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| invalid(var, value, e.to_string()))
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.completion.temperature, 0.0);
        assert_eq!(config.completion.timeout, Duration::from_secs(60));
        assert_eq!(config.concurrency, 1);
        assert!(!config.cache_policy_summaries);
    }

    #[test]
    fn test_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("MODEL_DEPLOYMENT_NAME", "gpt-4o-claims"),
            ("CLAIMCHECK_MAX_TOKENS", "1500"),
            ("CLAIMCHECK_REQUEST_TIMEOUT", "90s"),
            ("CLAIMCHECK_CONCURRENCY", "4"),
            ("CLAIMCHECK_CACHE_POLICY_SUMMARIES", "yes"),
            ("CLAIMCHECK_POLICY_CACHE_TTL", "10m"),
        ]))
        .unwrap();

        assert_eq!(config.completion.model, "gpt-4o-claims");
        assert_eq!(config.completion.max_tokens, 1500);
        assert_eq!(config.completion.timeout, Duration::from_secs(90));
        assert_eq!(config.concurrency, 4);
        assert!(config.cache_policy_summaries);
        assert_eq!(config.policy_cache_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[("CLAIMCHECK_CONCURRENCY", "  ")])).unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (var, value) in [
            ("CLAIMCHECK_CONCURRENCY", "0"),
            ("CLAIMCHECK_CONCURRENCY", "many"),
            ("CLAIMCHECK_TEMPERATURE", "3.5"),
            ("CLAIMCHECK_REQUEST_TIMEOUT", "soon"),
            ("CLAIMCHECK_CACHE_POLICY_SUMMARIES", "maybe"),
        ] {
            let result = RuntimeConfig::from_lookup(lookup(&[(var, value)]));
            match result {
                Err(ConfigError::Invalid { var: reported, .. }) => assert_eq!(reported, var),
                Ok(_) => panic!("{}={} should be rejected", var, value),
            }
        }
    }

    #[test]
    fn test_with_concurrency_floor() {
        assert_eq!(RuntimeConfig::default().with_concurrency(0).concurrency, 1);
    }

    proptest::proptest! {
        #[test]
        fn prop_positive_concurrency_accepted(n in 1usize..1024) {
            let value = n.to_string();
            let config = RuntimeConfig::from_lookup(lookup(&[("CLAIMCHECK_CONCURRENCY", value.as_str())])).unwrap();
            proptest::prop_assert_eq!(config.concurrency, n);
        }
    }
}
