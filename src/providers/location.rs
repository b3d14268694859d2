use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use thiserror::Error;

use crate::models::Position;
use crate::settings::LocationOptions;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location access denied by user")]
    PermissionDenied,
    #[error("Location information unavailable")]
    Unavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Geolocation is not supported by this browser")]
    Unsupported,
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Position, LocationError>;
}

/// Random walk around an origin. Stands in for a device GPS.
pub struct SimulatedLocation {
    options: LocationOptions,
    step_degrees: f64,
    inner: Mutex<WalkState>,
}

struct WalkState {
    latitude: f64,
    longitude: f64,
    last_fix: Option<Position>,
    forced_failure: Option<LocationError>,
}

impl SimulatedLocation {
    pub fn new(latitude: f64, longitude: f64, step_degrees: f64, options: LocationOptions) -> Self {
        Self {
            options,
            step_degrees,
            inner: Mutex::new(WalkState {
                latitude,
                longitude,
                last_fix: None,
                forced_failure: None,
            }),
        }
    }

    /// Make every following request fail with `error` until cleared.
    pub fn fail_with(&self, error: Option<LocationError>) {
        let mut state = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.forced_failure = error;
    }
}

#[async_trait]
impl LocationProvider for SimulatedLocation {
    async fn current_position(&self) -> Result<Position, LocationError> {
        let mut state = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(error) = state.forced_failure {
            return Err(error);
        }

        let now = Utc::now();
        let max_age = Duration::milliseconds(self.options.maximum_age_ms as i64);
        if let Some(fix) = state.last_fix {
            if now - fix.timestamp < max_age {
                return Ok(fix);
            }
        }

        let mut rng = rand::thread_rng();
        let lat_step = rng.gen_range(-1.0..=1.0) * self.step_degrees;
        state.latitude = (state.latitude + lat_step).clamp(-90.0, 90.0);
        state.longitude += rng.gen_range(-1.0..=1.0) * self.step_degrees;
        if state.longitude > 180.0 {
            state.longitude -= 360.0;
        } else if state.longitude < -180.0 {
            state.longitude += 360.0;
        }

        let accuracy = if self.options.enable_high_accuracy {
            rng.gen_range(5.0..20.0)
        } else {
            rng.gen_range(50.0..150.0)
        };

        let fix = Position {
            latitude: state.latitude,
            longitude: state.longitude,
            accuracy,
            timestamp: now,
        };
        state.last_fix = Some(fix);
        Ok(fix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(maximum_age_ms: u64) -> LocationOptions {
        LocationOptions {
            enable_high_accuracy: true,
            timeout_ms: 10_000,
            maximum_age_ms,
        }
    }

    #[tokio::test]
    async fn walk_stays_near_origin() {
        let provider = SimulatedLocation::new(40.0, -74.0, 0.001, options(0));
        for _ in 0..10 {
            let fix = provider.current_position().await.unwrap();
            assert!((fix.latitude - 40.0).abs() < 0.02);
            assert!((fix.longitude + 74.0).abs() < 0.02);
            assert!(fix.accuracy < 20.0);
        }
    }

    #[tokio::test]
    async fn recent_fix_is_reused_within_maximum_age() {
        let provider = SimulatedLocation::new(40.0, -74.0, 0.01, options(60_000));
        let first = provider.current_position().await.unwrap();
        let second = provider.current_position().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn forced_failure_is_reported() {
        let provider = SimulatedLocation::new(40.0, -74.0, 0.01, options(0));
        provider.fail_with(Some(LocationError::PermissionDenied));
        assert_eq!(
            provider.current_position().await,
            Err(LocationError::PermissionDenied)
        );
        provider.fail_with(None);
        assert!(provider.current_position().await.is_ok());
    }
}
