// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-device JSON log files.
//!
//! Entries are appended back to back with no separator, so a log file is a
//! stream of concatenated JSON objects (`{..}{..}{..}`), not JSON Lines.

use super::{SinkError, SinkOutcome};
use crate::device::DeviceIdentity;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends serialized readings to `{dir}/{device}.json`.
#[derive(Debug)]
pub struct JsonLogSink {
    dir: PathBuf,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl JsonLogSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DashMap::new(),
        }
    }

    /// Log file path for `device`.
    pub fn path_for(&self, device: &DeviceIdentity) -> PathBuf {
        self.dir.join(format!("{}.json", device))
    }

    /// Append `bytes` to the log file of `device`.
    ///
    /// Identities that would escape the log directory are refused.
    pub async fn append_for(&self, device: &DeviceIdentity, bytes: &[u8]) -> SinkOutcome {
        if !device.is_path_safe() {
            let err = std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("device name {:?} is not a valid file name", device.as_str()),
            );
            return SinkError::Io(err).into();
        }
        self.append(&self.path_for(device), bytes).await
    }

    /// Append `bytes` to `path`.
    pub async fn append(&self, path: &Path, bytes: &[u8]) -> SinkOutcome {
        let lease = self.lease(path);
        let result = {
            let _guard = lease.lock.lock().await;
            self.write(path, bytes).await
        };

        match result {
            Ok(()) => SinkOutcome::success(),
            Err(e) => e.into(),
        }
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), SinkError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "appended reading");
        Ok(())
    }

    // One lock per path; entries for the same file never interleave.
    fn lease<'a>(&'a self, path: &'a Path) -> PathLease<'a> {
        let lock = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        PathLease {
            sink: self,
            path,
            lock,
        }
    }
}

/// Holds a path lock registration; the entry is removed once the last
/// holder is gone, including when the append is cancelled.
struct PathLease<'a> {
    sink: &'a JsonLogSink,
    path: &'a Path,
    lock: Arc<Mutex<()>>,
}

impl Drop for PathLease<'_> {
    fn drop(&mut self) {
        // Our clone plus the map's.
        self.sink.locks.remove_if(self.path, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}
