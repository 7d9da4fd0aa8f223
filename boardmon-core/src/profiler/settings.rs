//! Profiler configuration
//!
//! Serde-backed so an embedding application can persist the settings;
//! every field has a sensible default and out-of-range values are clamped
//! through the `effective_*` accessors rather than rejected.

use serde::{Deserialize, Serialize};

/// Smallest polling interval the sampler will accept
pub const MIN_INTERVAL_MS: u64 = 50;

/// Smallest history length that still allows a delta computation
pub const MIN_HISTORY_LENGTH: usize = 2;

/// Configuration for a [`super::SystemProfiler`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilerSettings {
    /// Board address: `None` for the default debug-bridge device, a device
    /// id for a specific bridge device, or an IPv4 address for ssh
    #[serde(default)]
    pub board_address: Option<String>,
    /// History buffer capacity in ticks (default: 100)
    #[serde(default = "default_history_length")]
    pub history_length: usize,
    /// Polling interval in milliseconds (default: 500)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Per-invocation timeout for debug-bridge commands, and ssh connect
    /// timeout, in seconds (default: 5)
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Idle lifetime of the multiplexed ssh master connection in seconds
    /// (default: 10)
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

const fn default_history_length() -> usize {
    100
}

const fn default_interval_ms() -> u64 {
    500
}

const fn default_command_timeout_secs() -> u64 {
    5
}

const fn default_keep_alive_secs() -> u64 {
    10
}

impl Default for ProfilerSettings {
    fn default() -> Self {
        Self {
            board_address: None,
            history_length: default_history_length(),
            interval_ms: default_interval_ms(),
            command_timeout_secs: default_command_timeout_secs(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl ProfilerSettings {
    /// Sets the board address
    #[must_use]
    pub fn with_board_address(mut self, address: impl Into<String>) -> Self {
        self.board_address = Some(address.into());
        self
    }

    /// Sets the history buffer capacity
    #[must_use]
    pub const fn with_history_length(mut self, length: usize) -> Self {
        self.history_length = length;
        self
    }

    /// Sets the polling interval
    #[must_use]
    pub const fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Returns the polling interval clamped to at least [`MIN_INTERVAL_MS`]
    #[must_use]
    pub fn effective_interval_ms(&self) -> u64 {
        self.interval_ms.max(MIN_INTERVAL_MS)
    }

    /// Returns the history length clamped to at least [`MIN_HISTORY_LENGTH`]
    #[must_use]
    pub fn effective_history_length(&self) -> usize {
        self.history_length.max(MIN_HISTORY_LENGTH)
    }
}
