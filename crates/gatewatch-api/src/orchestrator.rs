//! HTTP client for the device orchestrator.
//!
//! The orchestrator provisions badge-reader and door containers and
//! reports their readiness. This is a boundary concern: polling here is
//! deadline-bounded and best-effort, unlike the stream which reconnects
//! forever.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::Error;

/// Default interval between readiness polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(800);

/// One provisioned device as reported by `GET /devices`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorDevice {
    pub id: String,
    /// Device kind: `"badgeuse"` or `"porte"`.
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ready: bool,
}

/// Health report from `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorHealth {
    #[serde(default)]
    pub ok: bool,
}

/// Client for the orchestrator REST API.
pub struct OrchestratorClient {
    base: Url,
    http: reqwest::Client,
}

impl OrchestratorClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("gatewatch/0.1.0")
            .build()?;
        Ok(Self { base, http })
    }

    /// Build a client around an existing `reqwest::Client` (tests).
    pub fn from_reqwest(base: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            base: base.parse()?,
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base.join(path)?)
    }

    /// Check orchestrator liveness.
    pub async fn health(&self) -> Result<OrchestratorHealth, Error> {
        let url = self.endpoint("health")?;
        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// List all provisioned devices.
    pub async fn list_devices(&self) -> Result<Vec<OrchestratorDevice>, Error> {
        let url = self.endpoint("devices")?;
        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Poll until the given device reports ready, or the deadline passes.
    ///
    /// Always bounded: returns `false` on timeout rather than hanging.
    /// Individual poll failures are swallowed and retried.
    pub async fn wait_ready(&self, kind: &str, device_id: &str, deadline: Duration) -> bool {
        self.wait_ready_with_interval(kind, device_id, deadline, DEFAULT_POLL_INTERVAL)
            .await
    }

    pub async fn wait_ready_with_interval(
        &self,
        kind: &str,
        device_id: &str,
        deadline: Duration,
        poll_interval: Duration,
    ) -> bool {
        let started = tokio::time::Instant::now();

        loop {
            if let Ok(devices) = self.list_devices().await {
                let found = devices
                    .iter()
                    .any(|d| d.id == device_id && d.kind == kind && d.ready);
                if found {
                    return true;
                }
            }

            if started.elapsed() + poll_interval > deadline {
                tracing::debug!(device_id, kind, "readiness deadline reached");
                return false;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
