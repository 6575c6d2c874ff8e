// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device identity resolution.

use crate::reading::ReadingSet;
use std::fmt;

/// Configured device value that derives the identity from the station ID.
pub const AUTO_DEVICE: &str = "auto";
/// Prefix for derived identities.
pub const DEVICE_PREFIX: &str = "weather_";
/// Station identifier field of the upload protocol.
pub const STATION_ID_FIELD: &str = "ID";

/// Name of the log file and of the FHEM pseudo-device for one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Usable as a single path component (no separators, not `.`/`..`).
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve the device identity.
///
/// `"auto"` yields `weather_<ID>`; a missing `ID` yields the bare prefix
/// `weather_`. Anything else is used literally.
pub fn resolve(configured: &str, readings: &ReadingSet) -> DeviceIdentity {
    if configured != AUTO_DEVICE {
        return DeviceIdentity::new(configured);
    }

    let station = readings
        .get(STATION_ID_FIELD)
        .map(|v| v.render())
        .unwrap_or_default();
    DeviceIdentity::new(format!("{}{}", DEVICE_PREFIX, station))
}
