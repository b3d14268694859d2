use std::time::Duration;

use crate::models::{Position, Reading};
use crate::providers::{AirQualityProvider, FetchError, LocationError, LocationProvider};

#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Success(Position, Reading),
    LocationFailed(LocationError),
    FetchFailed(FetchError),
}

impl SampleOutcome {
    /// Message shown to the user for a failed sample.
    pub fn error_message(&self) -> Option<String> {
        match self {
            SampleOutcome::Success(..) => None,
            SampleOutcome::LocationFailed(err) => Some(format!("Location error: {err}")),
            SampleOutcome::FetchFailed(err) => Some(format!("Location error: {err}")),
        }
    }
}

/// Location fix, then an AQI lookup for that fix. The location step is
/// bounded by `location_timeout`.
pub async fn fetch_sample(
    location: &dyn LocationProvider,
    air_quality: &dyn AirQualityProvider,
    location_timeout: Duration,
) -> SampleOutcome {
    let position = match tokio::time::timeout(location_timeout, location.current_position()).await {
        Ok(Ok(position)) => position,
        Ok(Err(err)) => return SampleOutcome::LocationFailed(err),
        Err(_) => return SampleOutcome::LocationFailed(LocationError::Timeout),
    };

    match air_quality
        .air_quality(position.latitude, position.longitude)
        .await
    {
        Ok(reading) => SampleOutcome::Success(position, reading),
        Err(err) => SampleOutcome::FetchFailed(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeMap;

    struct FixedLocation(Result<Position, LocationError>);

    #[async_trait]
    impl LocationProvider for FixedLocation {
        async fn current_position(&self) -> Result<Position, LocationError> {
            self.0
        }
    }

    struct NeverLocation;

    #[async_trait]
    impl LocationProvider for NeverLocation {
        async fn current_position(&self) -> Result<Position, LocationError> {
            std::future::pending().await
        }
    }

    struct EchoAir(Option<u32>);

    #[async_trait]
    impl AirQualityProvider for EchoAir {
        async fn air_quality(&self, latitude: f64, longitude: f64) -> Result<Reading, FetchError> {
            let aqi = self.0.ok_or_else(|| FetchError::new("upstream down"))?;
            Ok(Reading {
                aqi,
                pollutants: BTreeMap::new(),
                location: Coordinates {
                    latitude,
                    longitude,
                },
                observed_at: Utc::now(),
            })
        }
    }

    fn fix() -> Position {
        Position {
            latitude: 35.0,
            longitude: 139.0,
            accuracy: 8.0,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn success_pairs_position_with_reading() {
        let outcome =
            fetch_sample(&FixedLocation(Ok(fix())), &EchoAir(Some(44)), Duration::from_secs(1))
                .await;
        match outcome {
            SampleOutcome::Success(position, reading) => {
                assert_eq!(reading.aqi, 44);
                assert_eq!(reading.location, position.coordinates());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn location_failure_skips_aqi_lookup() {
        let outcome = fetch_sample(
            &FixedLocation(Err(LocationError::Unavailable)),
            &EchoAir(Some(44)),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(outcome, SampleOutcome::LocationFailed(LocationError::Unavailable));
        assert_eq!(
            outcome.error_message().as_deref(),
            Some("Location error: Location information unavailable")
        );
    }

    #[tokio::test]
    async fn aqi_failure_is_tagged() {
        let outcome =
            fetch_sample(&FixedLocation(Ok(fix())), &EchoAir(None), Duration::from_secs(1)).await;
        assert!(matches!(outcome, SampleOutcome::FetchFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_location_times_out() {
        let outcome =
            fetch_sample(&NeverLocation, &EchoAir(Some(1)), Duration::from_secs(10)).await;
        assert_eq!(outcome, SampleOutcome::LocationFailed(LocationError::Timeout));
    }
}
