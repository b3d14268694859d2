use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Upper bounds (inclusive) of each AQI band. Anything above the last bound is
/// `Category::Unhealthy`.
const GOOD_MAX: u32 = 50;
const MODERATE_MAX: u32 = 100;
const SENSITIVE_MAX: u32 = 150;

/// An air quality estimate for one location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub aqi: u32,
    /// Pollutant name (`pm25`, `pm10`, `o3`, ...) to concentration.
    pub pollutants: BTreeMap<String, f64>,
    pub location: Coordinates,
    pub observed_at: DateTime<Utc>,
}

impl Reading {
    pub fn category(&self) -> Category {
        Category::from_aqi(self.aqi)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
}

impl Category {
    /// Classify an AQI value. Total over every `u32`.
    pub fn from_aqi(aqi: u32) -> Self {
        if aqi <= GOOD_MAX {
            Category::Good
        } else if aqi <= MODERATE_MAX {
            Category::Moderate
        } else if aqi <= SENSITIVE_MAX {
            Category::UnhealthySensitive
        } else {
            Category::Unhealthy
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Good => "Good",
            Category::Moderate => "Moderate",
            Category::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            Category::Unhealthy => "Unhealthy",
        }
    }

    /// Stable identifier, suitable for styling hooks.
    pub fn id(&self) -> &'static str {
        match self {
            Category::Good => "good",
            Category::Moderate => "moderate",
            Category::UnhealthySensitive => "poor",
            Category::Unhealthy => "unhealthy",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Category::Good => "#00b894",
            Category::Moderate => "#fdcb6e",
            Category::UnhealthySensitive => "#fd79a8",
            Category::Unhealthy => "#e17055",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Category::Good => "Air quality is satisfactory for most people",
            Category::Moderate => "Air quality is acceptable for most people",
            Category::UnhealthySensitive => "Sensitive people should limit outdoor activities",
            Category::Unhealthy => "Everyone should limit outdoor activities",
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, Category::Good)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_upper_bounds() {
        assert_eq!(Category::from_aqi(0), Category::Good);
        assert_eq!(Category::from_aqi(50), Category::Good);
        assert_eq!(Category::from_aqi(51), Category::Moderate);
        assert_eq!(Category::from_aqi(100), Category::Moderate);
        assert_eq!(Category::from_aqi(101), Category::UnhealthySensitive);
        assert_eq!(Category::from_aqi(150), Category::UnhealthySensitive);
        assert_eq!(Category::from_aqi(151), Category::Unhealthy);
        assert_eq!(Category::from_aqi(u32::MAX), Category::Unhealthy);
    }

    #[test]
    fn category_metadata() {
        let sensitive = Category::UnhealthySensitive;
        assert_eq!(sensitive.id(), "poor");
        assert_eq!(sensitive.label(), "Unhealthy for Sensitive Groups");
        assert_eq!(Category::Good.color(), "#00b894");
        assert_eq!(
            Category::Unhealthy.description(),
            "Everyone should limit outdoor activities"
        );
        assert!(Category::Good.is_good());
        assert!(!Category::Moderate.is_good());
    }
}
