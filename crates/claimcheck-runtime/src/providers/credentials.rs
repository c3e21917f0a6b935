//! Provider settings and secrets, resolved from config or environment.
//!
//! Every value a provider needs to reach the model (endpoints, client ids,
//! client secrets) is loaded as a [`Credential`]. Credentials:
//!
//! - print as `[REDACTED]` in `Debug` and `Display`
//! - are zeroed on drop via `secrecy`
//! - remember where they came from, for configuration diagnostics
//!
//! A value in the JSON config wins over the environment. The binary loads
//! the deployment's `.env` file into the environment before any lookup.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from the JSON provider config
    Config,
    /// Loaded from an environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A secret provider setting.
pub struct Credential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl Credential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Resolve `config_key` from `config`, falling back to `env_var`.
    ///
    /// Empty strings count as unset in both places.
    pub fn resolve(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Option<Self> {
        if let Some(value) = config[config_key].as_str().filter(|v| !v.is_empty()) {
            return Some(Self::new(value, CredentialSource::Config, name));
        }

        std::env::var(env_var)
            .ok()
            .filter(|v| !v.is_empty())
            .map(|value| Self::new(value, CredentialSource::Environment, name))
    }

    /// The raw value. Call only where the value is sent.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

struct CredentialSpec {
    config_key: &'static str,
    env_var: &'static str,
    name: &'static str,
}

/// Declares the settings a provider needs and loads them in one pass.
///
/// All missing required settings are reported together, so a half-filled
/// `.env` file is fixed in one round trip.
///
/// ```ignore
/// let creds = CredentialBuilder::new()
///     .require("client_id", "AUTH_CLIENT_ID", "OAuth client id")
///     .optional("project_id", "PROJECT_ID", "Project id")
///     .build(&config)?;
/// ```
#[derive(Default)]
pub struct CredentialBuilder {
    required: Vec<CredentialSpec>,
    optional: Vec<CredentialSpec>,
}

impl CredentialBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, config_key: &'static str, env_var: &'static str, name: &'static str) -> Self {
        self.required.push(CredentialSpec {
            config_key,
            env_var,
            name,
        });
        self
    }

    pub fn optional(mut self, config_key: &'static str, env_var: &'static str, name: &'static str) -> Self {
        self.optional.push(CredentialSpec {
            config_key,
            env_var,
            name,
        });
        self
    }

    /// Resolve every declared setting.
    pub fn build(self, config: &JsonValue) -> Result<CredentialSet, ProviderError> {
        let mut credentials = BTreeMap::new();
        let mut missing = Vec::new();

        for spec in &self.required {
            match Credential::resolve(config, spec.config_key, spec.env_var, spec.name) {
                Some(cred) => {
                    credentials.insert(spec.config_key, cred);
                }
                None => missing.push(spec.env_var),
            }
        }

        if !missing.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "missing settings: {}",
                missing.join(", ")
            )));
        }

        for spec in &self.optional {
            if let Some(cred) = Credential::resolve(config, spec.config_key, spec.env_var, spec.name) {
                credentials.insert(spec.config_key, cred);
            }
        }

        Ok(CredentialSet { credentials })
    }
}

/// The loaded settings, keyed by config key.
pub struct CredentialSet {
    credentials: BTreeMap<&'static str, Credential>,
}

impl CredentialSet {
    /// Take a required setting out of the set.
    pub fn take(&mut self, key: &str) -> Result<Credential, ProviderError> {
        self.credentials
            .remove(key)
            .ok_or_else(|| ProviderError::NotConfigured(format!("setting '{}' not loaded", key)))
    }

    /// Take an optional setting out of the set.
    pub fn take_optional(&mut self, key: &str) -> Option<Credential> {
        self.credentials.remove(key)
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("keys", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}
