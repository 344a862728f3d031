//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// IANA zone name, or "local" for the system zone (default)
    pub time_zone: Option<String>,

    /// Daily window boundary (default: midnight)
    pub reset_time: Option<RawResetTime>,

    /// Allowance per window (default: one hour)
    pub time_limit: Option<RawTimeLimit>,

    /// What happens when a user runs out of time (default: ban)
    pub punishment: Option<RawPunishment>,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawResetTime {
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTimeLimit {
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
}

impl RawTimeLimit {
    pub fn total_seconds(&self) -> u64 {
        self.hours
            .saturating_mul(3600)
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.seconds)
    }
}

/// Punishment kind
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawPunishment {
    /// Refuse the user until the window ends
    Ban {
        /// Reason shown to the user. Supports placeholders.
        message: Option<String>,
    },
    /// Run an external command. Arguments support placeholders.
    Command { argv: Vec<String> },
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,
}
