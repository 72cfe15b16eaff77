//! Configuration types for api-gate
//!
//! Everything a session, cache or renderer needs is passed in explicitly through
//! [`Config`]. Nothing is read from or written to the process environment after
//! startup; [`DisplayConfig::from_env`] is the single place that looks at it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP session behavior (transport errors, concurrency, progress)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Surface transport failures as errors instead of sentinel responses (default: false)
    #[serde(default)]
    pub raise_on_transport_error: bool,

    /// Suppress batch progress reporting (default: false)
    #[serde(default)]
    pub disable_progress: bool,

    /// Upper bound on in-flight requests within one batch (default: 500)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-request timeout applied when a descriptor does not carry its own (None = no timeout)
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            raise_on_transport_error: false,
            disable_progress: false,
            max_concurrency: default_max_concurrency(),
            request_timeout: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Local file cache settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time to live applied to resources that do not declare one (default: 120 minutes)
    #[serde(default = "default_ttl_minutes")]
    pub default_ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: default_ttl_minutes(),
        }
    }
}

impl CacheConfig {
    /// Default time to live as a [`Duration`]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_minutes * 60)
    }
}

/// Terminal dimensions used when rendering output
///
/// A width or height of 0 means "unknown".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Terminal width in columns
    #[serde(default)]
    pub terminal_width: u16,

    /// Terminal height in lines
    #[serde(default)]
    pub terminal_height: u16,
}

impl DisplayConfig {
    /// Read `COLUMNS` and `LINES` once, falling back to 0 for missing or unparsable values
    pub fn from_env() -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.trim().parse::<u16>().ok())
                .unwrap_or(0)
        };
        Self {
            terminal_width: read("COLUMNS"),
            terminal_height: read("LINES"),
        }
    }
}

/// Main configuration for api-gate
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP session behavior
    #[serde(default)]
    pub session: SessionConfig,

    /// Local file cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Terminal dimensions for output rendering
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Reject settings that would make the library misbehave at runtime
    pub fn validate(&self) -> Result<()> {
        if self.session.max_concurrency == 0 {
            return Err(Error::Config {
                message: "max_concurrency must be at least 1".to_string(),
                key: Some("max_concurrency".to_string()),
            });
        }
        if self.session.user_agent.trim().is_empty() {
            return Err(Error::Config {
                message: "user_agent must not be empty".to_string(),
                key: Some("user_agent".to_string()),
            });
        }
        Ok(())
    }
}

fn default_max_concurrency() -> usize {
    500
}

fn default_ttl_minutes() -> u64 {
    120
}

fn default_user_agent() -> String {
    format!("api-gate/{}", env!("CARGO_PKG_VERSION"))
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");

        assert!(!config.session.raise_on_transport_error);
        assert!(!config.session.disable_progress);
        assert_eq!(config.session.max_concurrency, 500);
        assert_eq!(config.session.request_timeout, None);
        assert!(config.session.user_agent.starts_with("api-gate/"));
        assert_eq!(config.cache.default_ttl_minutes, 120);
        assert_eq!(config.display, DisplayConfig::default());
    }

    #[test]
    fn test_serde_defaults_match_default_impl() {
        let from_json: Config = serde_json::from_str("{}").unwrap();
        let from_default = Config::default();

        assert_eq!(
            from_json.session.max_concurrency,
            from_default.session.max_concurrency
        );
        assert_eq!(
            from_json.cache.default_ttl_minutes,
            from_default.cache.default_ttl_minutes
        );
        assert_eq!(from_json.session.user_agent, from_default.session.user_agent);
    }

    #[test]
    fn test_request_timeout_serialized_as_seconds() {
        let json = r#"{"session": {"request_timeout": 30, "max_concurrency": 8}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.session.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.session.max_concurrency, 8);

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["session"]["request_timeout"], 30);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.session.max_concurrency = 0;

        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("max_concurrency")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_default_ttl_duration() {
        let cache = CacheConfig {
            default_ttl_minutes: 5,
        };
        assert_eq!(cache.default_ttl(), Duration::from_secs(300));
    }
}
