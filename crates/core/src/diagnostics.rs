//! Diagnostic rule engine for compost readings.
//!
//! Pure logic: the caller fetches a reading and passes it in. Two rule
//! layers are evaluated independently and concatenated:
//!
//! 1. Single-parameter range checks (temperature, moisture, CO₂, TVOC).
//!    Every rule that applies emits one alert.
//! 2. The combined health/aeration matrix. Runs only when the reading
//!    carries both indices and always emits exactly one alert.

use crate::alert::{Alert, Severity};
use crate::reading::SensorReading;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

pub const TEMPERATURE_MIN_C: f64 = 40.0;
pub const TEMPERATURE_MAX_C: f64 = 70.0;
pub const MOISTURE_MIN_PERCENT: f64 = 30.0;
pub const MOISTURE_MAX_PERCENT: f64 = 70.0;
pub const CO2_MIN_PPM: f64 = 400.0;
pub const CO2_MAX_PPM: f64 = 5000.0;
pub const TVOC_MAX_PPM: f64 = 500.0;

/// Index values at or above this are considered high.
pub const INDEX_HIGH: f64 = 0.7;
/// Index values at or above this (and below [`INDEX_HIGH`]) are medium.
pub const INDEX_MEDIUM: f64 = 0.4;

// ---------------------------------------------------------------------------
// Index bands
// ---------------------------------------------------------------------------

/// Coarse band of a `[0, 1]` index used to select the matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    Medium,
    High,
}

impl Band {
    /// Classify an index value. Total over `f64`: values outside `[0, 1]`
    /// fall into the nearest band.
    pub fn of(value: f64) -> Self {
        if value >= INDEX_HIGH {
            Self::High
        } else if value >= INDEX_MEDIUM {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate a reading and return its alerts, single-parameter alerts first
/// and the combined-index alert (if any) last.
pub fn evaluate(reading: &SensorReading) -> Vec<Alert> {
    let mut alerts = parameter_alerts(reading);

    if let Some((chi, aeration)) = reading.indices() {
        alerts.push(condition_alert(chi, aeration));
    }

    alerts
}

/// Range checks on the four raw measurements, in fixed rule order.
pub fn parameter_alerts(reading: &SensorReading) -> Vec<Alert> {
    let rules: [(bool, &str, &str); 7] = [
        (
            reading.temperature < TEMPERATURE_MIN_C,
            "Temperature Too Low",
            "Turn the compost and add nitrogen-rich greens (food scraps, grass clippings).",
        ),
        (
            reading.temperature > TEMPERATURE_MAX_C,
            "Temperature Too High",
            "Add brown materials (dry leaves, cardboard) to cool the pile down.",
        ),
        (
            reading.moisture < MOISTURE_MIN_PERCENT,
            "Compost Too Dry",
            "Add water and mix in wet greens.",
        ),
        (
            reading.moisture > MOISTURE_MAX_PERCENT,
            "Compost Too Wet",
            "Add dry browns (shredded newspaper, sawdust) and turn the compost.",
        ),
        (
            reading.co2 < CO2_MIN_PPM,
            "CO₂ Too Low",
            "Microbial activity is minimal. Check moisture and add fresh greens.",
        ),
        (
            reading.co2 > CO2_MAX_PPM,
            "CO₂ Too High",
            "Turn the compost to aerate, add dry browns and reduce wet greens.",
        ),
        (
            reading.tvoc > TVOC_MAX_PPM,
            "Strong Odor Detected",
            "Turn the compost and balance greens with browns.",
        ),
    ];

    rules
        .into_iter()
        .filter(|(fired, _, _)| *fired)
        .map(|(_, issue, action)| Alert::new(issue, action, Severity::Warning))
        .collect()
}

/// The single combined verdict for a (health, aeration) pair.
///
/// Every pair maps to exactly one of nine cells; the match below is
/// exhaustive over `(Band, Band)`.
pub fn condition_alert(chi: f64, aeration: f64) -> Alert {
    use Band::{High, Low, Medium};

    let (issue, action, severity) = match (Band::of(chi), Band::of(aeration)) {
        (High, High) => (
            "Optimal Conditions",
            "No action needed! Compost conditions are ideal. Decomposition is rapid.",
            Severity::Info,
        ),
        (High, Medium) => (
            "Suboptimal Aeration",
            "Activity is healthy but airflow is limited. Turn the compost at the next opportunity.",
            Severity::Info,
        ),
        (High, Low) => (
            "Poor Aeration",
            "An active pile is running short of oxygen. Turn the compost now and add coarse browns for structure.",
            Severity::Warning,
        ),
        (Medium, High) => (
            "Moderate Health",
            "Airflow is good but activity is moderate. Add nitrogen-rich greens to boost decomposition.",
            Severity::Info,
        ),
        (Medium, Medium) => (
            "Suboptimal Conditions",
            "Turn compost to aerate and adjust moisture. Add high-nitrogen materials if too cold or browns if too wet.",
            Severity::Warning,
        ),
        (Medium, Low) => (
            "Anaerobic Risk",
            "Oxygen is depleted and anaerobic pockets are forming. Turn the compost immediately and add dry browns.",
            Severity::Critical,
        ),
        (Low, High) => (
            "Dry and Inactive",
            "Plenty of air but little activity. Add water and fresh greens to restart decomposition.",
            Severity::Warning,
        ),
        (Low, Medium) => (
            "Inactive Compost",
            "Decomposition has nearly stopped. Add greens, check moisture and turn the pile.",
            Severity::Warning,
        ),
        (Low, Low) => (
            "Critical Condition",
            "Severe anaerobic and inactive conditions detected. Turn compost to introduce oxygen, balance greens and browns.",
            Severity::Critical,
        ),
    };

    Alert::new(issue, action, severity)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
