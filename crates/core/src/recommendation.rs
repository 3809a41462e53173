//! Composting care recommendations.
//!
//! Complements the alert list with narrative guidance and a de-duplicated
//! set of care actions, plus a single "turn the pile" verdict.
//! Pure logic, evaluated against the four raw measurements.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::reading::SensorReading;

/// A concrete thing the operator can do to the pile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CareAction {
    TurnCompost,
    AddBrowns,
    AddGreens,
    AddWater,
    InsulateBin,
}

impl CareAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TurnCompost => "Turn compost",
            Self::AddBrowns => "Add browns",
            Self::AddGreens => "Add greens",
            Self::AddWater => "Add water",
            Self::InsulateBin => "Insulate bin",
        }
    }
}

/// Guidance derived from one reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    /// Observations and suggestions, one line each.
    pub details: Vec<String>,
    /// Distinct actions, in a stable order.
    pub actions: BTreeSet<CareAction>,
    /// Whether any rule asked for intervention.
    pub turn_compost: bool,
}

impl Recommendation {
    /// Action labels joined for a one-line summary, e.g.
    /// `"Turn compost, Add browns"`.
    pub fn compact_summary(&self) -> String {
        self.actions
            .iter()
            .map(CareAction::label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// All detail lines joined with newlines.
    pub fn detailed_explanation(&self) -> String {
        self.details.join("\n")
    }

    fn note(&mut self, line: &str) {
        self.details.push(line.to_string());
    }

    fn intervene(&mut self, observation: &str, suggestion: &str, actions: &[CareAction]) {
        self.note(observation);
        self.details.push(format!("Suggested: {suggestion}"));
        self.actions.extend(actions.iter().copied());
        self.turn_compost = true;
    }
}

/// Build a recommendation for a reading.
pub fn recommend(reading: &SensorReading) -> Recommendation {
    use CareAction::{AddBrowns, AddGreens, AddWater, InsulateBin, TurnCompost};

    let mut rec = Recommendation::default();
    let SensorReading {
        temperature,
        moisture,
        co2,
        tvoc,
        ..
    } = *reading;

    // Air quality.
    if co2 > 2000.0 {
        rec.intervene(
            "CO₂ is too high, indicating poor aeration and anaerobic activity.",
            "Turn compost, add dry browns, reduce wet greens.",
            &[TurnCompost, AddBrowns],
        );
    } else if (400.0..=1500.0).contains(&co2) {
        rec.note("CO₂ is within the normal range.");
    }

    if tvoc > 500.0 {
        rec.intervene(
            "TVOCs are too high, indicating gas buildup and potential odor issues.",
            "Turn compost, balance greens and browns.",
            &[TurnCompost],
        );
    }

    // Temperature.
    if temperature > 70.0 {
        rec.intervene(
            "Temperature is too high; beneficial microbes may start dying.",
            "Add more brown materials (dry leaves, cardboard) to cool down.",
            &[AddBrowns],
        );
    } else if (55.0..=65.0).contains(&temperature) {
        rec.note("Temperature is in the ideal decomposition range.");
    } else if (45.0..55.0).contains(&temperature) {
        rec.intervene(
            "Temperature is slowing down; decomposition is less efficient.",
            "Turn compost to aerate, check moisture levels.",
            &[TurnCompost],
        );
    } else if (40.0..45.0).contains(&temperature) {
        rec.intervene(
            "Microbial activity is too low.",
            "Turn compost, add nitrogen-rich greens (food scraps, grass).",
            &[TurnCompost, AddGreens],
        );
    } else if temperature < 15.0 {
        rec.intervene(
            "Temperature is too low; decomposition has nearly stopped.",
            "Add more greens, insulate the bin with a tarp.",
            &[AddGreens, InsulateBin],
        );
    }

    // Moisture.
    if moisture > 70.0 {
        rec.intervene(
            "Moisture is too high, leading to anaerobic conditions and bad odors.",
            "Add dry browns (shredded newspaper, sawdust), turn compost.",
            &[TurnCompost, AddBrowns],
        );
    } else if (40.0..=60.0).contains(&moisture) {
        rec.note("Moisture level is ideal.");
    } else if moisture < 30.0 {
        rec.intervene(
            "Compost is too dry; microbial activity may slow down.",
            "Add water, mix with wet greens.",
            &[AddWater, AddGreens],
        );
    }

    rec
}
