//! The seam between the acquisition loop and whatever produces readings.

use async_trait::async_trait;
use compost_core::reading::SensorReading;

/// Outcome of a successful round trip to the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum LatestReading {
    /// A well-formed reading for the requested device.
    Reading(SensorReading),
    /// The hub answered but holds nothing for the device yet. Carries the
    /// hub's explanation.
    NoData(String),
}

/// Something that can fetch the most recent reading for a device.
///
/// Implemented by [`SensorHubApi`](crate::api::SensorHubApi) for the HTTP
/// hub; tests substitute in-memory sources.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    async fn fetch_latest(&self, device_id: &str) -> Result<LatestReading, FetchError>;
}

/// Errors from a single fetch attempt. None of these are fatal: the
/// acquisition loop logs them and retries on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request itself failed (connect, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The hub returned a non-2xx status without a no-data body.
    #[error("Sensor hub error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The body could not be decoded into a reading.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// The configured hub URL cannot address API paths.
    #[error("Invalid sensor hub URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Short machine-readable kind for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Api { .. } => "api",
            Self::Malformed(_) => "malformed",
            Self::InvalidUrl(_) => "invalid_url",
        }
    }
}
