use std::time::Duration;

use compost_core::types::DeviceId;

/// Default sensor hub address.
pub const DEFAULT_HUB_URL: &str = "http://localhost:5000";
/// Default polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
/// Default per-request HTTP timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Base URL of the sensor hub.
    pub hub_url: String,
    /// Device to monitor. `None` means "first device the hub lists".
    pub device_id: Option<DeviceId>,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                       |
    /// |------------------------|-------------------------------|
    /// | `SENSORHUB_URL`        | `http://localhost:5000`       |
    /// | `DEVICE_ID`            | first entry of `GET /devices` |
    /// | `POLL_INTERVAL_MS`     | `2000`                        |
    /// | `REQUEST_TIMEOUT_SECS` | `5`                           |
    /// | `LOG_FORMAT`           | `text` (or `json`)            |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let hub_url = get("SENSORHUB_URL").unwrap_or_else(|| DEFAULT_HUB_URL.into());
        let device_id = get("DEVICE_ID");

        let poll_interval_ms = positive(
            "POLL_INTERVAL_MS",
            get("POLL_INTERVAL_MS"),
            DEFAULT_POLL_INTERVAL_MS,
        )?;
        let request_timeout_secs = positive(
            "REQUEST_TIMEOUT_SECS",
            get("REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "LOG_FORMAT",
                        value,
                        expected: "\"text\" or \"json\"",
                    })
                }
            },
        };

        Ok(Self {
            hub_url,
            device_id,
            poll_interval: Duration::from_millis(poll_interval_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
            log_format,
        })
    }
}

fn positive(var: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            expected: "a positive integer",
        }),
    }
}
