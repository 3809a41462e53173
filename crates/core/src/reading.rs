//! Sensor reading snapshot and acquisition channel state.

use serde::{Deserialize, Serialize};

use crate::types::{DeviceId, Timestamp};

/// One immutable snapshot of a compost bin's environment.
///
/// A reading belongs to the device it was fetched for. Readings from
/// different devices are never merged or compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub device_id: DeviceId,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative moisture, 0-100 %.
    pub moisture: f64,
    /// Carbon dioxide concentration in ppm.
    pub co2: f64,
    /// Total volatile organic compounds in ppm.
    pub tvoc: f64,
    /// Compost health index in `[0, 1]`, when the device derives one.
    pub chi: Option<f64>,
    /// Aeration index in `[0, 1]`, when the device derives one.
    pub aeration: Option<f64>,
    pub timestamp: Timestamp,
}

impl SensorReading {
    /// Create a reading with the four raw measurements and no derived
    /// indices.
    pub fn new(
        device_id: impl Into<DeviceId>,
        temperature: f64,
        moisture: f64,
        co2: f64,
        tvoc: f64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            temperature,
            moisture,
            co2,
            tvoc,
            chi: None,
            aeration: None,
            timestamp,
        }
    }

    /// Attach the derived health and aeration indices.
    pub fn with_indices(mut self, chi: f64, aeration: f64) -> Self {
        self.chi = Some(chi);
        self.aeration = Some(aeration);
        self
    }

    /// Both derived indices, if the device reported both.
    pub fn indices(&self) -> Option<(f64, f64)> {
        self.chi.zip(self.aeration)
    }
}

/// State of the acquisition channel for the selected device.
///
/// Only the outcome of the most recent fetch attempt moves the status;
/// elapsed time alone never does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// A cycle has started and no fetch has completed yet.
    #[default]
    Connecting,
    /// The last fetch returned a well-formed reading.
    Connected,
    /// The hub answered but has nothing for this device yet.
    NoData,
    /// The last fetch failed in transport or returned garbage.
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::NoData => "no_data",
            Self::Error => "error",
        }
    }

    /// Human-readable label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "Fetching data...",
            Self::Connected => "Connected",
            Self::NoData => "No data available",
            Self::Error => "Error fetching data",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
