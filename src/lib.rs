pub mod clock;
pub mod models;
pub mod persistence;
pub mod providers;
pub mod sampling;
pub mod settings;
pub mod tracker;
mod utils;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::time::{self, Instant, MissedTickBehavior};

use clock::SystemClock;
use persistence::LoggingSnapshotStore;
use providers::{SimulatedAirQuality, SimulatedLocation};
use settings::SettingsStore;
use tracker::TrackerController;

const DEFAULT_SETTINGS_FILE: &str = "healthy-air-settings.json";

fn settings_path() -> PathBuf {
    std::env::var_os("HEALTHY_AIR_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

/// Console host: simulated providers, a log-only snapshot store, and a
/// presenter that prints a status line whenever a new sample lands.
pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Healthy Air starting up...");

    let settings_store = SettingsStore::new(settings_path())?;
    let settings = settings_store.tracker().with_env_overrides();

    let location = Arc::new(SimulatedLocation::new(
        settings.simulation.origin_latitude,
        settings.simulation.origin_longitude,
        settings.simulation.walk_step_degrees,
        settings.location.clone(),
    ));
    let air_quality = Arc::new(SimulatedAirQuality::new(Duration::from_millis(
        settings.simulation.aqi_latency_ms,
    )));

    let controller = TrackerController::new(
        settings,
        location,
        air_quality,
        Arc::new(LoggingSnapshotStore),
        Arc::new(SystemClock),
    );
    controller
        .restore()
        .await
        .context("failed to restore previous session")?;

    let mut display_rx = controller.subscribe();
    try_start(&controller).await;
    let mut last_checked = display_rx.borrow_and_update().locations_checked;
    let mut last_error = None;

    // Stay idle after a failed start and try again once per sample period.
    let retry_every = controller.settings().sample_interval();
    let mut retry = time::interval_at(Instant::now() + retry_every, retry_every);
    retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = retry.tick() => {
                if !controller.is_tracking().await {
                    try_start(&controller).await;
                }
            }
            changed = display_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let display = display_rx.borrow_and_update().clone();
                let error = display.last_error.as_ref().map(|notice| notice.message.clone());
                if display.locations_checked != last_checked || error != last_error {
                    last_checked = display.locations_checked;
                    last_error = error;
                    info!("{}", display.status_line());
                } else {
                    debug!("{}", display.status_line());
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    let display = controller.stop().await;
    info!("{}", display.status_line());
    Ok(())
}

async fn try_start(controller: &TrackerController) -> bool {
    match controller.start().await {
        Ok(display) => {
            info!("{}", display.status_line());
            true
        }
        Err(err) => {
            warn!("Could not start tracking: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::LocationError;
    use settings::{LocationOptions, TrackerSettings};

    #[tokio::test]
    async fn failed_start_stays_idle_until_retry() {
        let location = Arc::new(SimulatedLocation::new(
            48.85,
            2.35,
            0.0005,
            LocationOptions::default(),
        ));
        location.fail_with(Some(LocationError::PermissionDenied));
        let controller = TrackerController::new(
            TrackerSettings::default(),
            location.clone(),
            Arc::new(SimulatedAirQuality::new(Duration::ZERO)),
            Arc::new(LoggingSnapshotStore),
            Arc::new(SystemClock),
        );

        assert!(!try_start(&controller).await);
        assert!(!controller.is_tracking().await);
        assert!(controller.display().await.last_error.is_some());

        location.fail_with(None);
        assert!(try_start(&controller).await);
        assert_eq!(controller.display().await.locations_checked, 1);
        controller.stop().await;
    }
}
