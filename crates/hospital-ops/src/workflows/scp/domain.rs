use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discrete answer choice worth a fixed number of points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub label: String,
    pub points: u32,
}

/// One clinical-observation question of a classification instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier used as the key in an [`AnswerSet`].
    pub key: String,
    pub text: String,
    pub options: Vec<AnswerOption>,
}

/// Inclusive score range mapped to a care-intensity class ("classe").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareBand {
    pub min: u32,
    pub max: u32,
    pub label: String,
}

impl CareBand {
    pub fn contains(&self, total: u32) -> bool {
        self.min <= total && total <= self.max
    }
}

/// Versioned definition of an SCP scoring instrument, served read-only by
/// the schema API. Question order is display order; it never affects the
/// score. Bands are declared lowest-acuity first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationSchema {
    pub method: String,
    pub questions: Vec<Question>,
    pub bands: Vec<CareBand>,
}

/// Chosen option points per question key; partial until every question has
/// an entry.
pub type AnswerSet = BTreeMap<String, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub total_points: u32,
    pub band: String,
}
