//! Compost monitor: wires the sensor hub acquisition loop to the
//! diagnostic engine.

pub mod config;
pub mod error;
pub mod report;

use compost_core::types::DeviceId;
use compost_sensorhub::api::SensorHubApi;

use crate::error::MonitorError;

/// Pick the device to monitor: the configured one, or else the first
/// device the hub lists.
pub async fn resolve_device(
    api: &SensorHubApi,
    configured: Option<&str>,
) -> Result<DeviceId, MonitorError> {
    if let Some(device_id) = configured {
        return Ok(device_id.to_string());
    }

    let devices = api.list_devices().await?;
    tracing::debug!(count = devices.len(), "Discovered devices");
    devices.into_iter().next().ok_or(MonitorError::NoDevices)
}
