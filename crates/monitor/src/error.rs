use compost_sensorhub::source::FetchError;

use crate::config::ConfigError;

/// Errors that stop the monitor before polling begins.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sensor hub unavailable: {0}")]
    Hub(#[from] FetchError),

    #[error("Sensor hub reports no devices")]
    NoDevices,
}
