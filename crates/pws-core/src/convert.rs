// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Imperial to metric conversion of PWS readings.
//!
//! Conversion is augmenting: every rule reads one original field and appends
//! a derived field. Rules never read derived fields, so the table can be
//! evaluated in any order with the same result.

use crate::reading::{ReadingSet, ReadingValue};
use chrono::{DateTime, Utc};

/// Miles per hour to kilometres per hour.
pub const MPH_TO_KMH: f64 = 1.60934;
/// Miles per hour to knots.
pub const MPH_TO_KTS: f64 = 0.868976;
/// Inches of mercury to hectopascal.
pub const INHG_TO_HPA: f64 = 33.86;
/// Inches to millimetres.
pub const IN_TO_MM: f64 = 25.4;

/// Field carrying the observation time.
pub const DATE_FIELD: &str = "dateutc";
/// Stations send this instead of a timestamp when they have no clock.
pub const DATE_NOW: &str = "now";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Conversion formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formula {
    /// `(f - 32) * 5 / 9`
    FahrenheitToCelsius,
    /// Multiply by a constant factor.
    Scale(f64),
}

impl Formula {
    pub fn apply(&self, input: f64) -> f64 {
        match self {
            Self::FahrenheitToCelsius => (input - 32.0) * 5.0 / 9.0,
            Self::Scale(factor) => input * factor,
        }
    }
}

/// One derived field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionRule {
    pub output: &'static str,
    pub input: &'static str,
    pub formula: Formula,
    pub places: usize,
}

impl ConversionRule {
    const fn new(output: &'static str, input: &'static str, formula: Formula) -> Self {
        Self {
            output,
            input,
            formula,
            places: 2,
        }
    }

    /// Evaluate against `readings`. `None` when the input is missing, not
    /// numeric, or too large to convert without overflowing.
    pub fn evaluate(&self, readings: &ReadingSet) -> Option<ReadingValue> {
        let input = readings.get(self.input)?.as_number()?;
        let converted = Some(self.formula.apply(input)).filter(|v| v.is_finite())?;
        let value = Some(round_half_away(converted, self.places)).filter(|v| v.is_finite())?;
        Some(ReadingValue::decimal(value, self.places))
    }
}

/// Derived fields, in the order they are appended.
pub const RULES: &[ConversionRule] = &[
    // Temperatures
    ConversionRule::new("windchillc", "windchillf", Formula::FahrenheitToCelsius),
    ConversionRule::new("indoortempc", "indoortempf", Formula::FahrenheitToCelsius),
    ConversionRule::new("tempc", "tempf", Formula::FahrenheitToCelsius),
    ConversionRule::new("dewptc", "dewptf", Formula::FahrenheitToCelsius),
    // Speeds
    ConversionRule::new("windgustkmh", "windgustmph", Formula::Scale(MPH_TO_KMH)),
    ConversionRule::new("windspeedkmh", "windspeedmph", Formula::Scale(MPH_TO_KMH)),
    ConversionRule::new("windgustkts", "windgustmph", Formula::Scale(MPH_TO_KTS)),
    ConversionRule::new("windspeedkts", "windspeedmph", Formula::Scale(MPH_TO_KTS)),
    // Precipitation
    ConversionRule::new("rainmm", "rainin", Formula::Scale(IN_TO_MM)),
    ConversionRule::new("dailyrainmm", "dailyrainin", Formula::Scale(IN_TO_MM)),
    ConversionRule::new("weeklyrainmm", "weeklyrainin", Formula::Scale(IN_TO_MM)),
    ConversionRule::new("monthlyrainmm", "monthlyrainin", Formula::Scale(IN_TO_MM)),
    ConversionRule::new("yearlyrainmm", "yearlyrainin", Formula::Scale(IN_TO_MM)),
    // Pressure
    ConversionRule::new("baromhpa", "baromin", Formula::Scale(INHG_TO_HPA)),
    ConversionRule::new("absbaromhpa", "absbaromin", Formula::Scale(INHG_TO_HPA)),
];

/// Convert using the current UTC time for `dateutc=now`.
pub fn convert(readings: &ReadingSet) -> ReadingSet {
    convert_at(readings, Utc::now())
}

/// Convert with an explicit clock.
pub fn convert_at(readings: &ReadingSet, now: DateTime<Utc>) -> ReadingSet {
    let mut out = readings.clone();

    for rule in RULES {
        match rule.evaluate(readings) {
            Some(value) => out.insert(rule.output, value),
            None => tracing::trace!(output = rule.output, input = rule.input, "conversion skipped"),
        }
    }

    if readings.text(DATE_FIELD) == Some(DATE_NOW) {
        out.insert(DATE_FIELD, now.format(TIMESTAMP_FORMAT).to_string());
    }

    out
}

/// Round to `places` decimals, halves away from zero.
///
/// Products such as `1.005 * 100` land a hair below the half in binary;
/// anything within 1e-9 of a half is treated as the half.
pub fn round_half_away(value: f64, places: usize) -> f64 {
    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    let frac = (scaled - scaled.trunc()).abs();
    let rounded = if (frac - 0.5).abs() < 1e-9 {
        scaled.trunc() + scaled.signum()
    } else {
        scaled.round()
    };
    rounded / factor
}
