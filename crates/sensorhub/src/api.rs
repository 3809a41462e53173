//! REST client for the sensor hub.
//!
//! Wraps the hub's HTTP endpoints (device listing, latest reading,
//! stored history) using [`reqwest`], and implements
//! [`ReadingSource`] so the acquisition loop can poll it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use compost_core::reading::SensorReading;
use compost_core::types::DeviceId;
use reqwest::{StatusCode, Url};

use crate::messages::{parse_devices, parse_history, parse_latest};
use crate::source::{FetchError, LatestReading, ReadingSource};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for a single sensor hub.
#[derive(Debug, Clone)]
pub struct SensorHubApi {
    client: reqwest::Client,
    base_url: Url,
}

impl SensorHubApi {
    /// Create a client for the hub at `base_url`, e.g.
    /// `http://localhost:5000`, with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// List the devices the hub has data for (`GET /devices`).
    pub async fn list_devices(&self) -> Result<Vec<DeviceId>, FetchError> {
        let response = self.client.get(self.endpoint(&["devices"])).send().await?;
        let body = Self::success_body(response).await?;
        parse_devices(&body)
    }

    /// Fetch the newest reading for a device (`GET /latest/{device_id}`).
    ///
    /// A `{"error": ...}` body is reported as [`LatestReading::NoData`],
    /// whether the hub sends it with `200` or `404`.
    pub async fn fetch_latest(&self, device_id: &str) -> Result<LatestReading, FetchError> {
        let response = self
            .client
            .get(self.endpoint(&["latest", device_id]))
            .send()
            .await?;
        let body = Self::no_data_tolerant_body(response).await?;
        parse_latest(&body, device_id, Utc::now())
    }

    /// Fetch the stored history for a device (`GET /data?device_id=...`),
    /// oldest first. A device with no stored data yields an empty list.
    pub async fn fetch_history(&self, device_id: &str) -> Result<Vec<SensorReading>, FetchError> {
        let response = self
            .client
            .get(self.endpoint(&["data"]))
            .query(&[("device_id", device_id)])
            .send()
            .await?;
        let body = Self::no_data_tolerant_body(response).await?;
        parse_history(&body, device_id, Utc::now())
    }

    // ---- private helpers ----

    /// Append path segments to the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Read the body of a 2xx response, or fail with
    /// [`FetchError::Api`].
    async fn success_body(response: reqwest::Response) -> Result<String, FetchError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Like [`success_body`](Self::success_body) but also passes `404`
    /// bodies through, since the hub reports missing data that way.
    async fn no_data_tolerant_body(response: reqwest::Response) -> Result<String, FetchError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(response.text().await?);
        }
        Self::success_body(response).await
    }
}

#[async_trait]
impl ReadingSource for SensorHubApi {
    async fn fetch_latest(&self, device_id: &str) -> Result<LatestReading, FetchError> {
        SensorHubApi::fetch_latest(self, device_id).await
    }
}
