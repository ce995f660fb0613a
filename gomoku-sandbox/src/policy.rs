//! Resource ceilings applied to every strongly-isolated execution.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed resource-limit configuration for the Docker sandbox.
///
/// Built once at startup and never mutated; every `run` call receives a
/// reference. The weak-isolation path cannot honor most of these (it shares
/// the host process) and uses none of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimitPolicy {
    /// Memory ceiling in bytes (default: 128MB)
    pub memory_limit: u64,
    /// Memory + swap ceiling in bytes; equal to `memory_limit` disables swap
    pub memswap_limit: u64,
    /// CPU scheduler period in microseconds
    pub cpu_period: u64,
    /// CPU quota per period in microseconds (50_000/100_000 = half a core)
    pub cpu_quota: u64,
    /// Process/thread count ceiling inside the sandbox
    pub pids_limit: u64,
    /// Network access (always false for strong isolation)
    pub network_enabled: bool,
    /// Size of the writable tmpfs scratch at /tmp, in bytes
    pub scratch_size: u64,
    /// Wall-clock budget for one execution
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Interval between run-state polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Grace period given to a graceful stop before force removal
    #[serde(with = "humantime_serde")]
    pub stop_grace: Duration,
    /// Base image holding the language runtime
    pub image: String,
    /// Working directory inside the container (the read-only code mount)
    pub workdir: String,
}

impl Default for ResourceLimitPolicy {
    fn default() -> Self {
        Self {
            memory_limit: 128 * 1024 * 1024,
            memswap_limit: 128 * 1024 * 1024,
            cpu_period: 100_000,
            cpu_quota: 50_000,
            pids_limit: 10,
            network_enabled: false,
            scratch_size: 64 * 1024 * 1024,
            timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            stop_grace: Duration::from_secs(1),
            image: "python:3.9-slim".into(),
            workdir: "/code".into(),
        }
    }
}

impl ResourceLimitPolicy {
    /// Deserialize a policy from a raw config section, treating an absent
    /// section (`null`) as the defaults.
    pub fn from_config_value(value: &serde_json::Value) -> gomoku_common::Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone()).map_err(gomoku_common::Error::from)
    }

    /// The tmpfs mount option string for the scratch area.
    pub fn scratch_mount_options(&self) -> String {
        format!("size={}", self.scratch_size)
    }
}
