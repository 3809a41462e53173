//! Operator alert types produced by the diagnostic engine.

use serde::{Deserialize, Serialize};

/// How urgently the operator should act on an alert.
///
/// Ordered from least to most urgent so alerts can be ranked with `max()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; no intervention required.
    Info,
    /// A parameter is outside its healthy range.
    Warning,
    /// Conditions that stall decomposition or produce odour if left alone.
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic finding with the action that addresses it.
///
/// Alerts are plain values, rebuilt on every evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alert {
    /// Short title, e.g. `"Compost Too Dry"`.
    pub issue: String,
    /// What the operator should do about it.
    pub action: String,
    pub severity: Severity,
}

impl Alert {
    pub fn new(issue: impl Into<String>, action: impl Into<String>, severity: Severity) -> Self {
        Self {
            issue: issue.into(),
            action: action.into(),
            severity,
        }
    }
}

/// The most urgent severity in a list of alerts, if any.
pub fn highest_severity(alerts: &[Alert]) -> Option<Severity> {
    alerts.iter().map(|a| a.severity).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn highest_severity_picks_most_urgent() {
        let alerts = vec![
            Alert::new("a", "x", Severity::Warning),
            Alert::new("b", "y", Severity::Critical),
            Alert::new("c", "z", Severity::Info),
        ];
        assert_eq!(highest_severity(&alerts), Some(Severity::Critical));
        assert_eq!(highest_severity(&[]), None);
    }

    #[test]
    fn severity_serializes_lowercase() {
        let alert = Alert::new("Compost Too Dry", "Add water", Severity::Warning);
        let json: serde_json::Value = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["issue"], "Compost Too Dry");
    }
}
