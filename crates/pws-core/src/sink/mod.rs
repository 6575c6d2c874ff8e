// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reading sinks: JSON file log, upstream relay and FHEM device sync.
//!
//! Every sink reports a [`SinkOutcome`]. Errors stop at the sink boundary so
//! one failing sink never keeps the others from running.

mod fhem;
mod json_log;
mod relay;

pub use fhem::DeviceSyncSink;
pub use json_log::JsonLogSink;
pub use relay::RelaySink;

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Sink errors.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl SinkError {
    /// Category reported in the outcome.
    pub fn kind(&self) -> SinkFailure {
        match self {
            Self::Connection(_) | Self::Http(_) => SinkFailure::Connection,
            Self::Io(_) => SinkFailure::Io,
            Self::Timeout(_) => SinkFailure::Timeout,
        }
    }
}

/// Failure category of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFailure {
    Connection,
    Io,
    Timeout,
}

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => f.write_str("connection"),
            Self::Io => f.write_str("io"),
            Self::Timeout => f.write_str("timeout"),
        }
    }
}

/// Result of dispatching a reading to one sink.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOutcome {
    /// The sink completed. The relay carries the upstream response body.
    Success { response: Option<String> },
    /// The sink was not run.
    Skipped { reason: String },
    /// The sink failed; later sinks still ran.
    Failed { cause: SinkFailure, message: String },
}

impl SinkOutcome {
    pub fn success() -> Self {
        Self::Success { response: None }
    }

    pub fn disabled() -> Self {
        Self::Skipped {
            reason: "disabled".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Failure category, if failed.
    pub fn failure(&self) -> Option<SinkFailure> {
        match self {
            Self::Failed { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}

impl From<SinkError> for SinkOutcome {
    fn from(err: SinkError) -> Self {
        Self::Failed {
            cause: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for SinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { .. } => f.write_str("ok"),
            Self::Skipped { reason } => write!(f, "skipped ({})", reason),
            Self::Failed { cause, message } => write!(f, "failed ({}): {}", cause, message),
        }
    }
}
