//! Board configuration.
//!
//! Configuration is plain data: callers build it with the `with_*` methods or
//! deserialize it from JSON. Unset keys take their defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default time a pending move may wait for confirming snapshots.
const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 10_000;

/// Tunables for a task board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    settle_timeout_ms: u64,
    rollback_on_failure: bool,
}

impl BoardConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            settle_timeout_ms: DEFAULT_SETTLE_TIMEOUT_MS,
            rollback_on_failure: true,
        }
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown keys and
    /// [`ConfigError::ZeroSettleTimeout`] when the settle timeout is zero.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        if config.settle_timeout_ms == 0 {
            return Err(ConfigError::ZeroSettleTimeout);
        }
        Ok(config)
    }

    /// Sets how long a pending move may wait before remote truth wins.
    #[must_use]
    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets whether a failed move transaction reverts the local splice.
    #[must_use]
    pub const fn with_rollback_on_failure(mut self, rollback: bool) -> Self {
        self.rollback_on_failure = rollback;
        self
    }

    /// Returns the settle timeout.
    #[must_use]
    pub const fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    /// Returns whether failed moves are rolled back locally.
    #[must_use]
    pub const fn rollback_on_failure(&self) -> bool {
        self.rollback_on_failure
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors returned while loading a [`BoardConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The input is not a valid configuration document.
    #[error("invalid board configuration: {0}")]
    Parse(String),

    /// A zero settle timeout would expire every move before it is shown.
    #[error("settle timeout must be greater than zero")]
    ZeroSettleTimeout,
}
