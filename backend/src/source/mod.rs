//! Upstream statistical sources.
//!
//! PxWeb tables are queried with a POST carrying a caller-supplied JSON
//! query body and answer with a JSON-stat cube. SDMX endpoints are queried
//! with a GET and the SDMX-JSON accept header.

use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::decode::sdmx::SDMX_ACCEPT;
use crate::error::{SourceError, SourceResult};
use crate::logs::JobLog;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// HTTP client for PxWeb and SDMX sources.
#[derive(Clone)]
pub struct SourceClient {
    client: reqwest::Client,
    max_retries: u32,
    log: JobLog,
}

impl SourceClient {
    /// Create a client with a request timeout.
    pub fn new(timeout: Duration, log: JobLog) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            log,
        })
    }

    /// Set the number of attempts (at least one).
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// POST a PxWeb query and return the JSON-stat payload.
    pub async fn fetch_pxweb(&self, url: &str, query: &Value) -> SourceResult<Value> {
        self.log.info(format!("📡 Querying PxWeb table {}", url));
        self.with_retry(url, || self.client.post(url).json(query)).await
    }

    /// GET an SDMX data URL and return the SDMX-JSON payload.
    pub async fn fetch_sdmx(&self, url: &str) -> SourceResult<Value> {
        self.log.info(format!("📡 Querying SDMX endpoint {}", url));
        self.with_retry(url, || {
            self.client
                .get(url)
                .header(reqwest::header::ACCEPT, SDMX_ACCEPT)
        })
        .await
    }

    async fn with_retry<F>(&self, url: &str, build: F) -> SourceResult<Value>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.send(url, build()).await {
                Ok(payload) => return Ok(payload),
                Err(e) => {
                    let retryable = match &e {
                        SourceError::RequestFailed(_) => true,
                        SourceError::Status { status, .. } => *status >= 500,
                        _ => false,
                    };
                    self.log.warning(format!(
                        "Attempt {}/{} failed: {}",
                        attempt, self.max_retries, e
                    ));
                    last_error = Some(e);

                    if !retryable {
                        break;
                    }
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SourceError::RequestFailed("no attempt made".into())))
    }

    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> SourceResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;
        let payload: Value =
            serde_json::from_str(&body).map_err(|e| SourceError::InvalidJson(e.to_string()))?;

        self.log.success(format!("Received {} bytes", body.len()));
        Ok(payload)
    }
}

/// Read a JSON document (PxWeb query body or a saved payload) from disk.
pub fn load_json_file(path: &Path) -> SourceResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| SourceError::InvalidJson(format!("{}: {}", path.display(), e)))
}
