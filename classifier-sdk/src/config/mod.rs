//! Configuration management for the classification client
//!
//! Configuration values come from pluggable providers (environment, memory,
//! or an ordered chain of both) and are collected into an explicit
//! `ClassifierConfig` that is passed to the client and the retry controller.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::resilience::RetryConfig;

/// Default endpoint of the OpenAI-compatible API
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Largest accepted backoff base, in seconds
pub const MAX_BACKOFF_BASE_SECONDS: f64 = 3600.0;

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a float configuration value
    fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<f64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid float for key {}: {}", key, e)))
    }

    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Integer value, default when the key is missing
    ///
    /// A present but unparsable value is still an error.
    fn get_int_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.get_string(key) {
            Ok(_) => self.get_int(key),
            Err(_) => Ok(default),
        }
    }

    /// Float value, default when the key is missing
    fn get_float_or(&self, key: &str, default: f64) -> Result<f64> {
        match self.get_string(key) {
            Ok(_) => self.get_float(key),
            Err(_) => Ok(default),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));
        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for tests and command-line overrides
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }

    /// Set a value only when one is given
    pub fn set_opt<K, V>(&mut self, key: K, value: Option<V>)
    where
        K: Into<String>,
        V: ToString,
    {
        if let Some(value) = value {
            self.set(key, value);
        }
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// A config provider that tries multiple providers in order
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Builder form of `add_provider`
    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.add_provider(provider);
        self
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.get_string(key).ok())
            .ok_or_else(|| {
                ServiceError::configuration(format!(
                    "Configuration key not found in any provider: {}",
                    key
                ))
            })
    }
}

/// Process-wide environment provider, reading `NPS_*` variables
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("NPS")));

/// Configuration of the classification client and its retry budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// API key
    pub api_key: String,

    /// Base URL (can be changed for proxies or compatible gateways)
    pub base_url: String,

    /// Model identifier, fixed for the whole run
    pub model: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Attempts per row, including the first one
    pub max_attempts: u32,

    /// Linear backoff base; the wait after attempt n is base * n
    pub backoff_base_seconds: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: 60,
            max_attempts: 4,
            backoff_base_seconds: 5.0,
        }
    }
}

impl ClassifierConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let api_key = provider.get_string("openai_api_key")?;
        let base_url = provider.get_string_or("openai_base_url", &defaults.base_url);
        let model = provider.get_string_or("model", &defaults.model);
        let timeout_seconds =
            provider.get_int_or("timeout_seconds", defaults.timeout_seconds as i64)?;
        let max_attempts = provider.get_int_or("max_attempts", defaults.max_attempts as i64)?;
        let backoff_base_seconds =
            provider.get_float_or("backoff_base_seconds", defaults.backoff_base_seconds)?;

        if timeout_seconds <= 0 {
            return Err(ServiceError::configuration("timeout_seconds must be positive"));
        }
        if max_attempts < 1 || max_attempts > u32::MAX as i64 {
            return Err(ServiceError::configuration("max_attempts must be at least 1"));
        }

        let config = Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout_seconds: timeout_seconds as u64,
            max_attempts: max_attempts as u32,
            backoff_base_seconds,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load from the `NPS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_provider(DEFAULT_PROVIDER.as_ref())
    }

    /// Validate this configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ServiceError::configuration("OpenAI API key is required"));
        }
        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("OpenAI base URL is required"));
        }
        if self.model.trim().is_empty() {
            return Err(ServiceError::configuration("Model identifier is required"));
        }
        if self.max_attempts < 1 {
            return Err(ServiceError::configuration("max_attempts must be at least 1"));
        }
        if !self.backoff_base_seconds.is_finite() || self.backoff_base_seconds < 0.0 {
            return Err(ServiceError::configuration(
                "backoff_base_seconds must be a non-negative number",
            ));
        }
        if self.backoff_base_seconds > MAX_BACKOFF_BASE_SECONDS {
            return Err(ServiceError::configuration(format!(
                "backoff_base_seconds must not exceed {}",
                MAX_BACKOFF_BASE_SECONDS
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Retry budget and backoff derived from this configuration
    ///
    /// An unvalidated base that is not a representable duration falls back to
    /// no delay.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.max_attempts,
            Duration::try_from_secs_f64(self.backoff_base_seconds).unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("key1", "value1");
        provider.set("key2", "123");

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_int("key2").unwrap(), 123);
        assert!(provider.get_string("key3").is_err());
    }

    #[test]
    fn test_env_key_format() {
        let provider = EnvConfigProvider::new().with_prefix("NPS");
        assert_eq!(provider.format_key("openai_api_key"), "NPS_OPENAI_API_KEY");
        assert_eq!(provider.format_key("backoff-base-seconds"), "NPS_BACKOFF_BASE_SECONDS");
    }

    #[test]
    fn test_composite_order() {
        let mut overrides = MemoryConfigProvider::new();
        overrides.set("model", "gpt-4o");

        let mut base = MemoryConfigProvider::new();
        base.set("model", "gpt-4o-mini");
        base.set("openai_api_key", "k");

        let provider = CompositeConfigProvider::new()
            .with_provider(overrides)
            .with_provider(base);

        assert_eq!(provider.get_string("model").unwrap(), "gpt-4o");
        assert_eq!(provider.get_string("openai_api_key").unwrap(), "k");
        assert!(provider.get_string("missing").is_err());
    }
}
