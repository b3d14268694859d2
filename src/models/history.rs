//! Per-sample records kept for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Position, Reading};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub observed_at: DateTime<Utc>,
    pub coordinates_text: String,
    pub aqi: u32,
    pub category: Category,
}

impl HistoryEntry {
    pub fn new(position: &Position, reading: &Reading, observed_at: DateTime<Utc>) -> Self {
        Self {
            observed_at,
            coordinates_text: position.coordinates_text(),
            aqi: reading.aqi,
            category: reading.category(),
        }
    }
}

/// The most recent sample, ingested or merely observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestConditions {
    pub position: Position,
    pub reading: Reading,
    pub category: Category,
}

impl LatestConditions {
    pub fn new(position: Position, reading: Reading) -> Self {
        let category = reading.category();
        Self {
            position,
            reading,
            category,
        }
    }

    /// e.g. `AQI: 42 - Good`
    pub fn summary(&self) -> String {
        format!("AQI: {} - {}", self.reading.aqi, self.category.label())
    }
}
