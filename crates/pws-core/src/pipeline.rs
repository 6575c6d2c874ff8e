// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingest pipeline.
//!
//! One call handles one upload:
//!
//! ```text
//! query --> ReadingSet --> [relay] --> resolve device --> [convert] --> serialize
//!                                                                        |
//!                                     [json log] <-----------------------+
//!                                     [fhem sync] <-- + json, url, settings_*
//! ```
//!
//! Sinks never abort the pipeline. Each one reports a [`SinkOutcome`] and
//! the station always gets [`ACKNOWLEDGMENT`].

use crate::config::Settings;
use crate::convert;
use crate::device::{self, DeviceIdentity};
use crate::reading::ReadingSet;
use crate::serialize;
use crate::sink::{DeviceSyncSink, JsonLogSink, RelaySink, SinkError, SinkFailure, SinkOutcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Body returned to the station regardless of sink outcomes.
pub const ACKNOWLEDGMENT: &str = "success";

/// Field holding the relay target URL.
pub const FORWARD_URL_FIELD: &str = "forward_url";
/// Field holding the relay response body.
pub const FORWARD_FIELD: &str = "forward";

/// Request details needed beyond the query parameters.
#[derive(Debug, Clone, Default)]
pub struct HttpContext {
    /// `Host` header of the inbound request.
    pub host: Option<String>,
    /// Path and query exactly as received (`/path?a=1&b=2`).
    pub request_uri: String,
}

impl HttpContext {
    pub fn new(host: Option<String>, request_uri: impl Into<String>) -> Self {
        Self {
            host,
            request_uri: request_uri.into(),
        }
    }

    /// URL the station used to reach us.
    pub fn url(&self) -> String {
        format!(
            "http://{}{}",
            self.host.as_deref().unwrap_or_default(),
            self.request_uri
        )
    }
}

/// Per-request result.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub device: DeviceIdentity,
    /// Working set after relay and conversion, as logged.
    pub readings: ReadingSet,
    pub relay: SinkOutcome,
    pub json_log: SinkOutcome,
    pub fhem: SinkOutcome,
}

impl PipelineReport {
    /// Outcomes by sink name.
    pub fn outcomes(&self) -> [(&'static str, &SinkOutcome); 3] {
        [
            ("relay", &self.relay),
            ("json_log", &self.json_log),
            ("fhem", &self.fhem),
        ]
    }

    pub fn failed_sinks(&self) -> Vec<&'static str> {
        self.outcomes()
            .into_iter()
            .filter(|(_, o)| o.is_failed())
            .map(|(name, _)| name)
            .collect()
    }

    /// Caller-visible response; never depends on the outcomes.
    pub fn acknowledgment(&self) -> &'static str {
        ACKNOWLEDGMENT
    }
}

/// Pipeline bound to one set of settings. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct IngestPipeline {
    settings: Arc<Settings>,
    relay: Option<RelaySink>,
    json_log: JsonLogSink,
    fhem: DeviceSyncSink,
}

impl IngestPipeline {
    /// Build the pipeline and its sinks.
    pub fn new(settings: Arc<Settings>) -> Result<Self, SinkError> {
        let relay = if settings.forward_data {
            Some(RelaySink::new(
                settings.forward_server.clone(),
                settings.forward_timeout(),
            )?)
        } else {
            None
        };

        Ok(Self {
            json_log: JsonLogSink::new(settings.json_data_logdir.clone()),
            fhem: DeviceSyncSink::new(
                settings.fhem_server.clone(),
                settings.fhem_port,
                settings.fhem_timeout(),
            ),
            relay,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one upload through every enabled stage.
    pub async fn ingest<I, K, V>(&self, query: I, ctx: &HttpContext) -> PipelineReport
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let initial = ReadingSet::from_pairs(query);
        let settings = &self.settings;

        // Relay first; the response lands in the working set.
        let mut working = initial.clone();
        let relay = match &self.relay {
            Some(relay) => {
                working.insert(FORWARD_URL_FIELD, relay.target_url(&ctx.request_uri));
                let outcome = relay.forward(&ctx.request_uri).await;
                if let SinkOutcome::Success {
                    response: Some(body),
                } = &outcome
                {
                    working.insert(FORWARD_FIELD, body.clone());
                }
                outcome
            }
            None => SinkOutcome::disabled(),
        };

        // Identity comes from the station's own fields, never the relay's.
        let device = device::resolve(&settings.device, &initial);

        if settings.convert_data {
            working = convert::convert(&working);
        }

        let payload = serialize::serialize_to_string(&working);
        if let Err(e) = &payload {
            warn!(device = %device, error = %e, "failed to serialize readings");
        }

        let json_log = if !settings.json_data_log {
            SinkOutcome::disabled()
        } else {
            match &payload {
                Ok(payload) => self.json_log.append_for(&device, payload.as_bytes()).await,
                Err(e) => SinkOutcome::Failed {
                    cause: SinkFailure::Io,
                    message: format!("cannot serialize readings: {}", e),
                },
            }
        };

        let fhem = if settings.fhem_data_log {
            let json = payload.as_deref().unwrap_or_default();
            let view = self.sync_view(&working, json, &device, ctx);
            self.fhem.sync(&device, &view).await
        } else {
            SinkOutcome::disabled()
        };

        let report = PipelineReport {
            device,
            readings: working,
            relay,
            json_log,
            fhem,
        };
        log_report(&report);
        report
    }

    /// Working set plus payload and settings, as sent to FHEM.
    fn sync_view(
        &self,
        working: &ReadingSet,
        payload: &str,
        device: &DeviceIdentity,
        ctx: &HttpContext,
    ) -> ReadingSet {
        let s = &self.settings;
        let logfile = self.json_log.path_for(device);

        working
            .clone()
            .with("json", payload)
            .with("url", ctx.url())
            .with("settings_device", device.as_str())
            .with("settings_convert_data", flag(s.convert_data))
            .with("settings_json_data_log", flag(s.json_data_log))
            .with(
                "settings_json_data_logdir",
                s.json_data_logdir.display().to_string(),
            )
            .with(
                "settings_json_data_logfile",
                logfile.display().to_string(),
            )
            .with("settings_fhem_data_log", flag(s.fhem_data_log))
            .with("settings_forward_data", flag(s.forward_data))
            .with("settings_forward_server", s.forward_server.as_str())
            .with("settings_FHEM_server", s.fhem_server.as_str())
            .with("settings_FHEM_port", s.fhem_port.to_string())
    }
}

fn flag(enabled: bool) -> &'static str {
    if enabled {
        "1"
    } else {
        "0"
    }
}

fn log_report(report: &PipelineReport) {
    for (sink, outcome) in report.outcomes() {
        match outcome {
            SinkOutcome::Failed { cause, message } => {
                warn!(device = %report.device, sink, %cause, "{}", message);
            }
            other => debug!(device = %report.device, sink, outcome = %other),
        }
    }
    info!(
        device = %report.device,
        fields = report.readings.len(),
        failed = report.failed_sinks().len(),
        "ingested reading"
    );
}
