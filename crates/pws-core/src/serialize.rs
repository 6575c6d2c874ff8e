// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Canonical JSON encoding of reading sets.
//!
//! Output is a single JSON object, fields in insertion order. Text values
//! become JSON strings; derived values become JSON numbers written with
//! their fixed decimal places (`"tempc":0.00`), which is why they go out as
//! raw number tokens instead of through `f64` formatting.

use crate::reading::{ReadingSet, ReadingValue};
use serde::ser::{Error as _, SerializeMap, Serializer};
use serde::Serialize;
use serde_json::value::RawValue;

impl Serialize for ReadingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Decimal { .. } => {
                let raw = RawValue::from_string(self.render()).map_err(S::Error::custom)?;
                raw.serialize(serializer)
            }
        }
    }
}

impl Serialize for ReadingSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Encode a reading set as compact JSON bytes.
pub fn serialize(readings: &ReadingSet) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(readings)
}

/// Encode a reading set as a compact JSON string.
pub fn serialize_to_string(readings: &ReadingSet) -> Result<String, serde_json::Error> {
    serde_json::to_string(readings)
}
