use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Timelike, Utc};
use rand::Rng;
use thiserror::Error;

use crate::models::{Coordinates, Reading};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to fetch air quality data")]
pub struct FetchError {
    pub reason: Option<String>,
}

impl FetchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait AirQualityProvider: Send + Sync {
    async fn air_quality(&self, latitude: f64, longitude: f64) -> Result<Reading, FetchError>;
}

const BASE_AQI: f64 = 50.0;
const MIN_AQI: f64 = 10.0;
const RUSH_HOUR_PENALTY: f64 = 30.0;
const NOISE_SPAN: f64 = 40.0;

/// Deterministic-plus-noise AQI estimate. Not a real AQI computation.
pub struct SimulatedAirQuality {
    latency: Duration,
}

impl SimulatedAirQuality {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl AirQualityProvider for SimulatedAirQuality {
    async fn air_quality(&self, latitude: f64, longitude: f64) -> Result<Reading, FetchError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(FetchError::new(format!(
                "invalid coordinates {latitude}, {longitude}"
            )));
        }

        tokio::time::sleep(self.latency).await;

        let (aqi, pollutants) = {
            let mut rng = rand::thread_rng();
            let noise = (rng.gen::<f64>() - 0.5) * NOISE_SPAN;
            let base = simulated_aqi(latitude, longitude, Local::now().hour(), noise);
            (base.round() as u32, simulated_pollutants(base, &mut rng))
        };

        Ok(Reading {
            aqi,
            pollutants,
            location: Coordinates {
                latitude,
                longitude,
            },
            observed_at: Utc::now(),
        })
    }
}

fn is_rush_hour(hour: u32) -> bool {
    (7..=9).contains(&hour) || (17..=19).contains(&hour)
}

/// Geographic pattern, rush-hour penalty and noise, floored at `MIN_AQI`.
fn simulated_aqi(latitude: f64, longitude: f64, local_hour: u32, noise: f64) -> f64 {
    let location_factor = ((latitude * 0.1).sin() + (longitude * 0.1).cos()) * 20.0;
    let time_factor = if is_rush_hour(local_hour) {
        RUSH_HOUR_PENALTY
    } else {
        0.0
    };
    (BASE_AQI + location_factor + time_factor + noise).max(MIN_AQI)
}

fn simulated_pollutants(aqi: f64, rng: &mut impl Rng) -> BTreeMap<String, f64> {
    // (name, share of the AQI, noise ceiling)
    const PROFILE: [(&str, f64, f64); 6] = [
        ("pm25", 0.8, 10.0),
        ("pm10", 1.2, 15.0),
        ("o3", 0.6, 8.0),
        ("no2", 0.4, 5.0),
        ("so2", 0.3, 3.0),
        ("co", 0.1, 2.0),
    ];

    PROFILE
        .iter()
        .map(|(name, share, noise)| {
            let value = (aqi * share + rng.gen::<f64>() * noise).round();
            (name.to_string(), value)
        })
        .collect()
}
