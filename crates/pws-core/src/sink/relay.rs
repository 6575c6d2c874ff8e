// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Upstream relay.
//!
//! Replays the station's request path and query against another collector
//! (typically the public PWS network) and captures the response body.

use super::{SinkError, SinkOutcome};
use std::time::Duration;

/// Forwards the original request to `http://{server}{request_uri}`.
#[derive(Debug, Clone)]
pub struct RelaySink {
    server: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RelaySink {
    /// Create a relay bound by `timeout` per request.
    pub fn new(server: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| SinkError::Http(e.to_string()))?;

        Ok(Self {
            server: server.into(),
            timeout,
            client,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Upstream URL for an inbound request URI (path plus query).
    pub fn target_url(&self, request_uri: &str) -> String {
        format!("http://{}{}", self.server, request_uri)
    }

    /// Fetch the upstream URL. The body is returned in the outcome.
    pub async fn forward(&self, request_uri: &str) -> SinkOutcome {
        let url = self.target_url(request_uri);
        match self.fetch(&url).await {
            Ok(body) => SinkOutcome::Success {
                response: Some(body),
            },
            Err(e) => e.into(),
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, SinkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Http(format!("upstream returned {}", status)));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        tracing::debug!(url, status = status.as_u16(), bytes = body.len(), "relayed reading");
        Ok(body)
    }

    fn classify(&self, err: reqwest::Error) -> SinkError {
        if err.is_timeout() {
            SinkError::Timeout(self.timeout)
        } else if err.is_connect() {
            SinkError::Connection(err.to_string())
        } else {
            SinkError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkFailure;
    use axum::{routing::get, Router};

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr.to_string()
    }

    #[test]
    fn test_target_url() {
        let relay = RelaySink::new("rtupdate.example.com", Duration::from_secs(1)).unwrap();
        assert_eq!(
            relay.target_url("/weatherstation/updateweatherstation.php?ID=KX1&tempf=70"),
            "http://rtupdate.example.com/weatherstation/updateweatherstation.php?ID=KX1&tempf=70"
        );
    }

    #[tokio::test]
    async fn test_forward_captures_body() {
        let app = Router::new().route(
            "/weatherstation/updateweatherstation.php",
            get(|| async { "success\n" }),
        );
        let server = spawn_upstream(app).await;
        let relay = RelaySink::new(server, Duration::from_secs(5)).unwrap();

        let outcome = relay
            .forward("/weatherstation/updateweatherstation.php?ID=KX1")
            .await;
        assert_eq!(
            outcome,
            SinkOutcome::Success {
                response: Some("success\n".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_forward_error_status_fails() {
        let server = spawn_upstream(Router::new()).await;
        let relay = RelaySink::new(server, Duration::from_secs(5)).unwrap();

        let outcome = relay.forward("/missing").await;
        assert_eq!(outcome.failure(), Some(SinkFailure::Connection));
    }

    #[tokio::test]
    async fn test_forward_times_out() {
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                "late"
            }),
        );
        let server = spawn_upstream(app).await;
        let relay = RelaySink::new(server, Duration::from_millis(200)).unwrap();

        let outcome = relay.forward("/slow").await;
        assert_eq!(outcome.failure(), Some(SinkFailure::Timeout));
    }

    #[tokio::test]
    async fn test_forward_unreachable() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let relay = RelaySink::new(addr.to_string(), Duration::from_secs(2)).unwrap();
        let outcome = relay.forward("/").await;
        assert!(outcome.is_failed());
    }
}
