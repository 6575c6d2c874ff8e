// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ordered reading sets.
//!
//! A [`ReadingSet`] keeps fields in insertion order. The FHEM sync replays
//! fields in that order and the JSON log relies on it for stable diffs, so
//! the set is backed by a vector of pairs rather than a hash map.

use std::fmt;

/// A single reading value.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValue {
    /// Raw text, as received from the station or a sink.
    Text(String),
    /// Derived numeric value with a fixed number of decimal places.
    Decimal { value: f64, places: usize },
}

impl ReadingValue {
    /// Create a decimal value, normalizing negative zero.
    pub fn decimal(value: f64, places: usize) -> Self {
        let value = if value == 0.0 { 0.0 } else { value };
        Self::Decimal { value, places }
    }

    /// Text form of the value (`0.00` for a two-place decimal zero).
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Decimal { value, places } => format!("{:.*}", *places, value),
        }
    }

    /// Borrow the raw text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Decimal { .. } => None,
        }
    }

    /// Parse as a finite number.
    ///
    /// Surrounding whitespace is ignored; `inf`/`NaN` are not accepted.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Self::Decimal { value, .. } => Some(*value),
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Decimal { value, places } => write!(f, "{:.*}", *places, value),
        }
    }
}

impl From<&str> for ReadingValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ReadingValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Ordered, case-sensitive field name to value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingSet {
    fields: Vec<(String, ReadingValue)>,
}

impl ReadingSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Build a set from decoded query parameters, keeping their order.
    ///
    /// A repeated name keeps the position of its first occurrence and the
    /// value of its last.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = Self::new();
        for (name, value) in pairs {
            set.insert(name, ReadingValue::Text(value.into()));
        }
        set
    }

    /// Insert or replace a field. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ReadingValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter().position(|(n, _)| *n == name) {
            Some(i) => self.fields[i].1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Return a copy of this set with `name` set to `value`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ReadingValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ReadingValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Raw text of a field, if present and textual.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ReadingValue::as_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReadingValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
