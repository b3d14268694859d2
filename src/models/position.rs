use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A location fix as delivered by a location provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn coordinates_text(&self) -> String {
        self.coordinates().to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}°, {:.4}°", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_text_uses_four_decimals() {
        let position = Position {
            latitude: 37.774929,
            longitude: -122.419416,
            accuracy: 12.0,
            timestamp: Utc::now(),
        };
        assert_eq!(position.coordinates_text(), "37.7749°, -122.4194°");
    }
}
