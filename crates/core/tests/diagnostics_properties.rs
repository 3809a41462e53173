//! Property tests for the diagnostic engine.
//!
//! Covers the safe-range guarantee, the fixed matrix verdicts, exclusivity
//! of the combined-index rule over the whole unit square, and determinism.

use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use compost_core::alert::Severity;
use compost_core::diagnostics::{evaluate, parameter_alerts};
use compost_core::reading::SensorReading;

/// Issues the combined-index rule can produce.
const MATRIX_ISSUES: [&str; 9] = [
    "Optimal Conditions",
    "Suboptimal Aeration",
    "Poor Aeration",
    "Moderate Health",
    "Suboptimal Conditions",
    "Anaerobic Risk",
    "Dry and Inactive",
    "Inactive Compost",
    "Critical Condition",
];

fn safe_reading() -> SensorReading {
    SensorReading::new(
        "d4e5f6",
        58.0,
        50.0,
        900.0,
        120.0,
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
    )
}

fn matrix_alert_count(reading: &SensorReading) -> usize {
    evaluate(reading)
        .iter()
        .filter(|a| MATRIX_ISSUES.contains(&a.issue.as_str()))
        .count()
}

// ---------------------------------------------------------------------------
// Test: safe ranges never trigger single-parameter alerts
// ---------------------------------------------------------------------------

#[test]
fn safe_ranges_produce_no_parameter_alerts() {
    let mut rng = StdRng::seed_from_u64(0x00c0_ffee);

    for _ in 0..2_000 {
        let reading = SensorReading {
            temperature: rng.random_range(40.0..=70.0),
            moisture: rng.random_range(30.0..=70.0),
            co2: rng.random_range(400.0..=5000.0),
            tvoc: rng.random_range(0.0..=500.0),
            ..safe_reading()
        };
        assert!(
            parameter_alerts(&reading).is_empty(),
            "unexpected alert for {reading:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// Test: fixed matrix verdicts
// ---------------------------------------------------------------------------

#[test]
fn both_high_is_optimal_and_alone() {
    let alerts = evaluate(&safe_reading().with_indices(0.9, 0.9));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].issue, "Optimal Conditions");
    assert_eq!(alerts[0].severity, Severity::Info);
}

#[test]
fn both_low_is_critical() {
    let alerts = evaluate(&safe_reading().with_indices(0.3, 0.3));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].issue, "Critical Condition");
    assert_eq!(alerts[0].severity, Severity::Critical);
}

#[test]
fn both_medium_is_suboptimal() {
    let alerts = evaluate(&safe_reading().with_indices(0.5, 0.5));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].issue, "Suboptimal Conditions");
}

// ---------------------------------------------------------------------------
// Test: exactly one matrix cell fires for every point of the unit square
// ---------------------------------------------------------------------------

#[test]
fn matrix_fires_exactly_once_for_random_pairs() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..10_000 {
        let chi: f64 = rng.random_range(0.0..=1.0);
        let aeration: f64 = rng.random_range(0.0..=1.0);
        let reading = safe_reading().with_indices(chi, aeration);

        assert_eq!(
            matrix_alert_count(&reading),
            1,
            "chi={chi} aeration={aeration}"
        );
    }
}

#[test]
fn matrix_fires_exactly_once_on_threshold_lines() {
    let edges = [0.0, 0.4, 0.7, 1.0, 0.399_999_999, 0.699_999_999];
    for chi in edges {
        for aeration in edges {
            let reading = safe_reading().with_indices(chi, aeration);
            assert_eq!(
                matrix_alert_count(&reading),
                1,
                "chi={chi} aeration={aeration}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Test: evaluation is deterministic and leaves its input untouched
// ---------------------------------------------------------------------------

#[test]
fn evaluate_is_idempotent() {
    let reading = SensorReading {
        temperature: 22.0,
        moisture: 81.0,
        tvoc: 720.0,
        ..safe_reading()
    }
    .with_indices(0.55, 0.2);
    let before = reading.clone();

    let first = evaluate(&reading);
    let second = evaluate(&reading);

    assert_eq!(first, second);
    assert_eq!(reading, before);
    assert_eq!(first.last().map(|a| a.issue.as_str()), Some("Anaerobic Risk"));
}
