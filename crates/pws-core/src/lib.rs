// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PWS ingest pipeline
//!
//! Normalizes uploads from personal weather stations (Wunderground PWS
//! protocol) and fans them out to independent sinks.
//!
//! # Features
//!
//! - **Unit Conversion**: Fahrenheit, mph, inches and inHg to metric fields
//! - **JSON Log**: Per-device append-only files of concatenated JSON objects
//! - **Relay**: Forward the raw upload to an upstream collector
//! - **FHEM Sync**: Mirror every field into an FHEM dummy device over telnet
//!
//! A failing sink is reported in the [`PipelineReport`] and logged, but never
//! stops the other sinks or changes the station's acknowledgment.
//!
//! # Example
//!
//! ```rust,ignore
//! use pws_core::{HttpContext, IngestPipeline, Settings};
//! use std::sync::Arc;
//!
//! let settings = Settings::from_file("pws.toml")?;
//! let pipeline = IngestPipeline::new(Arc::new(settings))?;
//!
//! let ctx = HttpContext::new(Some("pws.lan".into()), "/weatherstation/updateweatherstation.php?ID=KX1&tempf=70.1");
//! let report = pipeline.ingest([("ID", "KX1"), ("tempf", "70.1")], &ctx).await;
//! assert_eq!(report.acknowledgment(), "success");
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! device = "auto"
//! json_data_log = true
//! fhem_data_log = true
//! convert_data = true
//! forward_data = true
//! FHEM_server = "127.0.0.1"
//! FHEM_port = 7072
//! json_data_logdir = "/var/data"
//! forward_server = "rtupdate.wunderground.com"
//! ```

pub mod config;
pub mod convert;
pub mod device;
pub mod pipeline;
pub mod reading;
pub mod serialize;
pub mod sink;

pub use config::{ConfigError, Settings};
pub use convert::{convert, ConversionRule, Formula, RULES};
pub use device::{resolve, DeviceIdentity};
pub use pipeline::{HttpContext, IngestPipeline, PipelineReport, ACKNOWLEDGMENT};
pub use reading::{ReadingSet, ReadingValue};
pub use serialize::serialize;
pub use sink::{DeviceSyncSink, JsonLogSink, RelaySink, SinkError, SinkFailure, SinkOutcome};
