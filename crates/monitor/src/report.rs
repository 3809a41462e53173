//! Per-update report combining a reading with its diagnosis.

use compost_core::alert::{highest_severity, Alert, Severity};
use compost_core::diagnostics::evaluate;
use compost_core::reading::{ConnectionStatus, SensorReading};
use compost_core::recommendation::{recommend, Recommendation};
use compost_core::types::DeviceId;
use serde::Serialize;

/// Everything the monitor knows after one acquisition update.
///
/// `alerts` is empty and `recommendation` is `None` whenever there is no
/// reading to diagnose.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub device_id: DeviceId,
    pub status: ConnectionStatus,
    pub reading: Option<SensorReading>,
    pub alerts: Vec<Alert>,
    pub recommendation: Option<Recommendation>,
}

impl CycleReport {
    /// Diagnose `reading`, if any, for the update delivered with `status`.
    pub fn build(
        device_id: impl Into<DeviceId>,
        reading: Option<SensorReading>,
        status: ConnectionStatus,
    ) -> Self {
        let alerts = reading.as_ref().map(evaluate).unwrap_or_default();
        let recommendation = reading.as_ref().map(recommend);
        Self {
            device_id: device_id.into(),
            status,
            reading,
            alerts,
            recommendation,
        }
    }

    /// Most severe alert in the report.
    pub fn severity(&self) -> Option<Severity> {
        highest_severity(&self.alerts)
    }

    /// Emit the report as tracing events. Each alert is logged at a level
    /// matching its severity.
    pub fn log(&self) {
        let Some(reading) = &self.reading else {
            match self.status {
                ConnectionStatus::Error => tracing::warn!(
                    device_id = %self.device_id,
                    status = %self.status,
                    "{}",
                    self.status.label(),
                ),
                _ => tracing::info!(
                    device_id = %self.device_id,
                    status = %self.status,
                    "{}",
                    self.status.label(),
                ),
            }
            return;
        };

        tracing::info!(
            device_id = %self.device_id,
            status = %self.status,
            temperature = reading.temperature,
            moisture = reading.moisture,
            co2 = reading.co2,
            tvoc = reading.tvoc,
            chi = reading.chi,
            aeration = reading.aeration,
            alerts = self.alerts.len(),
            "Reading received",
        );

        for alert in &self.alerts {
            match alert.severity {
                Severity::Critical => tracing::error!(
                    device_id = %self.device_id,
                    action = %alert.action,
                    "{}",
                    alert.issue,
                ),
                Severity::Warning => tracing::warn!(
                    device_id = %self.device_id,
                    action = %alert.action,
                    "{}",
                    alert.issue,
                ),
                Severity::Info => tracing::info!(
                    device_id = %self.device_id,
                    action = %alert.action,
                    "{}",
                    alert.issue,
                ),
            }
        }

        if let Some(rec) = self.recommendation.as_ref().filter(|r| r.turn_compost) {
            tracing::info!(
                device_id = %self.device_id,
                actions = %rec.compact_summary(),
                "Care recommended",
            );
        }
    }
}
