// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge settings.
//!
//! Loaded once at startup from TOML and shared read-only afterwards. Option
//! names follow the upload script conventions (`FHEM_server`, `FHEM_port`
//! keep their casing).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Bridge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// `"auto"` derives `weather_<ID>`; anything else is used literally.
    #[serde(default = "default_device")]
    pub device: String,

    /// Append each reading to `{json_data_logdir}/{device}.json`.
    #[serde(default = "default_true")]
    pub json_data_log: bool,

    /// Mirror readings into an FHEM dummy device.
    #[serde(default = "default_true")]
    pub fhem_data_log: bool,

    /// Add metric fields.
    #[serde(default = "default_true")]
    pub convert_data: bool,

    /// Relay the raw request to `forward_server`.
    #[serde(default = "default_true")]
    pub forward_data: bool,

    /// FHEM host.
    #[serde(rename = "FHEM_server", default = "default_fhem_server")]
    pub fhem_server: String,

    /// FHEM telnet port.
    #[serde(rename = "FHEM_port", default = "default_fhem_port")]
    pub fhem_port: u16,

    /// Directory of the per-device JSON logs.
    #[serde(default = "default_logdir")]
    pub json_data_logdir: PathBuf,

    /// Upstream host (optionally `host:port`) for the relay.
    #[serde(default)]
    pub forward_server: String,

    /// Relay request deadline (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub forward_timeout_ms: u64,

    /// FHEM session deadline (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub fhem_timeout_ms: u64,
}

fn default_device() -> String {
    crate::device::AUTO_DEVICE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_fhem_server() -> String {
    "127.0.0.1".to_string()
}

fn default_fhem_port() -> u16 {
    7072
}

fn default_logdir() -> PathBuf {
    PathBuf::from("/var/data")
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: default_device(),
            json_data_log: true,
            fhem_data_log: true,
            convert_data: true,
            forward_data: true,
            fhem_server: default_fhem_server(),
            fhem_port: default_fhem_port(),
            json_data_logdir: default_logdir(),
            forward_server: String::new(),
            forward_timeout_ms: default_timeout_ms(),
            fhem_timeout_ms: default_timeout_ms(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.is_empty() {
            return Err(ConfigError::Invalid("device must not be empty".into()));
        }

        if self.fhem_data_log {
            if self.fhem_server.is_empty() {
                return Err(ConfigError::Invalid(
                    "FHEM_server is required when fhem_data_log is enabled".into(),
                ));
            }
            if self.fhem_port == 0 {
                return Err(ConfigError::Invalid("FHEM_port must not be 0".into()));
            }
        }

        if self.forward_data && self.forward_server.is_empty() {
            return Err(ConfigError::Invalid(
                "forward_server is required when forward_data is enabled".into(),
            ));
        }

        if self.forward_timeout_ms == 0 || self.fhem_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be greater than 0".into()));
        }

        Ok(())
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }

    pub fn fhem_timeout(&self) -> Duration {
        Duration::from_millis(self.fhem_timeout_ms)
    }

    /// Names of the enabled stages, for startup logs and `/api/v1/info`.
    pub fn enabled_stages(&self) -> Vec<&'static str> {
        let mut stages = Vec::new();
        if self.forward_data {
            stages.push("relay");
        }
        if self.convert_data {
            stages.push("convert");
        }
        if self.json_data_log {
            stages.push("json_log");
        }
        if self.fhem_data_log {
            stages.push("fhem");
        }
        stages
    }
}
