//! Session configuration.

use std::time::Duration;

use crate::reconnect::ReconnectConfig;

/// Time allowed for a TCP connect to complete.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time a command may stay outstanding before it resolves as a timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding [`SessionConfig::connect_timeout`], in ms.
pub const ENV_CONNECT_TIMEOUT_MS: &str = "CIV7_CONNECT_TIMEOUT_MS";

/// Environment variable overriding [`SessionConfig::command_timeout`], in ms.
pub const ENV_COMMAND_TIMEOUT_MS: &str = "CIV7_COMMAND_TIMEOUT_MS";

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Timeout for each connect attempt
    pub connect_timeout: Duration,
    /// Timeout for each outstanding command
    pub command_timeout: Duration,
    /// Backoff between connect attempts
    pub reconnect: ReconnectConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults, overridden by `CIV7_*_MS` environment variables when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults, overridden by whatever `lookup` returns for the `CIV7_*_MS`
    /// keys. Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(timeout) = millis(&lookup, ENV_CONNECT_TIMEOUT_MS) {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = millis(&lookup, ENV_COMMAND_TIMEOUT_MS) {
            config.command_timeout = timeout;
        }

        config
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid timeout override");
            None
        },
    }
}
