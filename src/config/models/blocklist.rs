//! IP blocklist configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Blocklist configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocklistConfig {
    /// Message returned in the `ip_blocked` rejection payload
    #[serde(default = "default_block_message")]
    pub message: String,
    /// Automatic blocking after repeated rate-limit violations
    #[serde(default)]
    pub auto_block: AutoBlockConfig,
}

impl Default for BlocklistConfig {
    fn default() -> Self {
        Self {
            message: default_block_message(),
            auto_block: AutoBlockConfig::default(),
        }
    }
}

/// Escalation from repeated rate-limit rejections to a block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoBlockConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Rejections within `violation_window_ms` that trigger a block
    #[serde(default = "default_max_violations")]
    pub max_violations: u32,
    #[serde(default = "default_violation_window_ms")]
    pub violation_window_ms: u64,
    #[serde(default = "default_block_duration_ms")]
    pub block_duration_ms: u64,
}

fn default_max_violations() -> u32 {
    10
}

fn default_violation_window_ms() -> u64 {
    10 * 60 * 1000
}

fn default_block_duration_ms() -> u64 {
    60 * 60 * 1000
}

impl Default for AutoBlockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_violations: default_max_violations(),
            violation_window_ms: default_violation_window_ms(),
            block_duration_ms: default_block_duration_ms(),
        }
    }
}

impl AutoBlockConfig {
    #[inline]
    pub fn violation_window(&self) -> Duration {
        Duration::from_millis(self.violation_window_ms)
    }

    #[inline]
    pub fn block_duration(&self) -> Duration {
        Duration::from_millis(self.block_duration_ms)
    }
}
