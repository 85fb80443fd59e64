//! Serializable handler settings.
//!
//! Backends and offload managers are live objects and are always passed to
//! the builders directly; only plain values live here so that embedding
//! applications can keep them in their own YAML or JSON files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::{DEFAULT_TTL, ExpirationTable};

/// Default upper bound on how long a fallback request waits for upstream.
pub const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_secs(1);

/// Default bound on every store call made by the fallback handler.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(250);

/// Settings of [`CacheAside`](crate::CacheAside).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheAsideConfig {
    /// TTL per status code.
    pub expiration: ExpirationTable,
    /// Namespace prepended to every key.
    pub key_prefix: Option<String>,
}

impl CacheAsideConfig {
    /// Checks the expiration table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.expiration.validate()
    }
}

/// Settings of [`FallbackRace`](crate::FallbackRace).
///
/// ```
/// use std::time::Duration;
/// use stashbox::FallbackConfig;
///
/// let config: FallbackConfig = serde_json::from_str(
///     r#"{"max_timeout": "300ms", "cache_duration": "1h"}"#,
/// ).unwrap();
///
/// assert_eq!(config.max_timeout, Duration::from_millis(300));
/// assert_eq!(config.cache_duration, Duration::from_secs(3600));
/// assert_eq!(config.store_timeout, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    /// How long to wait for upstream before serving the cached answer.
    #[serde(with = "humantime_serde")]
    pub max_timeout: Duration,
    /// TTL of every stored response. Zero disables storing.
    #[serde(with = "humantime_serde")]
    pub cache_duration: Duration,
    /// Bound on each store read or write.
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,
    /// Namespace prepended to every key.
    pub key_prefix: Option<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        FallbackConfig {
            max_timeout: DEFAULT_MAX_TIMEOUT,
            cache_duration: DEFAULT_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            key_prefix: None,
        }
    }
}

impl FallbackConfig {
    /// Rejects zero timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("max_timeout"));
        }
        if self.store_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("store_timeout"));
        }
        Ok(())
    }
}
