// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! FHEM telnet sync.
//!
//! Session layout (each line CR+LF terminated):
//!
//! ```text
//! define <device> dummy
//! setreading <device> <field> <value>     (once per field, in order)
//! exit
//! ```
//!
//! Values go out verbatim. A value containing a space or a line break
//! corrupts the command stream; the FHEM side defines the protocol, so
//! nothing is escaped here.

use super::{SinkError, SinkOutcome};
use crate::device::DeviceIdentity;
use crate::reading::ReadingSet;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

const LINE_END: &str = "\r\n";

/// Mirrors readings into an FHEM dummy device over its telnet port.
#[derive(Debug, Clone)]
pub struct DeviceSyncSink {
    address: String,
    port: u16,
    timeout: Duration,
}

impl DeviceSyncSink {
    pub fn new(address: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            port,
            timeout,
        }
    }

    /// Full command stream for one session.
    pub fn commands(device: &DeviceIdentity, readings: &ReadingSet) -> String {
        let mut out = String::new();
        out.push_str(&format!("define {} dummy{}", device, LINE_END));
        for (name, value) in readings.iter() {
            out.push_str(&format!("setreading {} {} {}{}", device, name, value, LINE_END));
        }
        out.push_str("exit");
        out.push_str(LINE_END);
        out
    }

    /// Send one session. Connection and writes share a single deadline.
    pub async fn sync(&self, device: &DeviceIdentity, readings: &ReadingSet) -> SinkOutcome {
        let session = self.send(device, readings);
        let result = match tokio::time::timeout(self.timeout, session).await {
            Ok(result) => result,
            Err(_) => Err(SinkError::Timeout(self.timeout)),
        };

        match result {
            Ok(()) => SinkOutcome::success(),
            Err(e) => e.into(),
        }
    }

    async fn send(&self, device: &DeviceIdentity, readings: &ReadingSet) -> Result<(), SinkError> {
        let mut stream = TcpStream::connect((self.address.as_str(), self.port))
            .await
            .map_err(|e| {
                SinkError::Connection(format!("{}:{}: {}", self.address, self.port, e))
            })?;
        stream.set_nodelay(true)?;

        let commands = Self::commands(device, readings);
        stream.write_all(commands.as_bytes()).await?;
        stream.flush().await?;
        stream.shutdown().await?;

        tracing::debug!(
            device = %device,
            fields = readings.len(),
            "synced readings to {}:{}",
            self.address,
            self.port
        );
        Ok(())
    }
}
