use std::sync::Arc;

use anyhow::Result;
use log::{debug, error, info, warn};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::{
    clock::Clock,
    persistence::SnapshotStore,
    providers::{AirQualityProvider, LocationProvider},
    sampling::{fetch_sample, SampleOutcome, SamplingSchedule},
    settings::TrackerSettings,
};

use super::{DisplaySnapshot, Session, SessionSnapshot, TrackerError};

/// What a single sampling cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sample accounted for in the running session.
    Ingested,
    /// Sample shown as latest conditions only (tracker idle).
    Observed,
    /// Location or AQI lookup failed; the error is on display.
    Failed,
    /// Another fetch was still outstanding.
    Coalesced,
    /// Tracking stopped or restarted while the fetch was outstanding.
    Stale,
    /// The tracker is idle; periodic cycles do nothing.
    NotTracking,
}

/// Owns a `Session` and drives it from providers, timers and user actions.
#[derive(Clone)]
pub struct TrackerController {
    state: Arc<Mutex<Session>>,
    location: Arc<dyn LocationProvider>,
    air_quality: Arc<dyn AirQualityProvider>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    settings: Arc<TrackerSettings>,
    schedule: Arc<Mutex<Option<SamplingSchedule>>>,
    display_tx: Arc<watch::Sender<DisplaySnapshot>>,
}

impl TrackerController {
    pub fn new(
        settings: TrackerSettings,
        location: Arc<dyn LocationProvider>,
        air_quality: Arc<dyn AirQualityProvider>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session = Session::new(settings.history_capacity);
        let initial =
            DisplaySnapshot::from_session(&session, clock.now(), settings.history_display_limit);
        let (display_tx, _) = watch::channel(initial);

        Self {
            state: Arc::new(Mutex::new(session)),
            location,
            air_quality,
            store,
            clock,
            settings: Arc::new(settings),
            schedule: Arc::new(Mutex::new(None)),
            display_tx: Arc::new(display_tx),
        }
    }

    /// Load the last saved snapshot, if any. Returns whether one was found.
    pub async fn restore(&self) -> Result<bool> {
        let Some(snapshot) = self.store.load()? else {
            return Ok(false);
        };

        {
            let mut state = self.state.lock().await;
            state.restore(snapshot);
            info!(
                "Restored {} readings and {} history entries",
                state.locations_checked(),
                state.history().len()
            );
        }
        self.publish().await;
        Ok(true)
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Display updates for a presentation layer. The latest value is always
    /// readable; nothing is queued.
    pub fn subscribe(&self) -> watch::Receiver<DisplaySnapshot> {
        self.display_tx.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.clone()
    }

    pub async fn display(&self) -> DisplaySnapshot {
        let state = self.state.lock().await;
        self.display_for(&state)
    }

    pub async fn is_tracking(&self) -> bool {
        self.state.lock().await.is_tracking()
    }

    pub async fn is_fetch_in_flight(&self) -> bool {
        self.state.lock().await.is_fetch_in_flight()
    }

    pub async fn has_schedule(&self) -> bool {
        self.schedule
            .lock()
            .await
            .as_ref()
            .map(SamplingSchedule::is_active)
            .unwrap_or(false)
    }

    /// Idle -> Tracking. The first sample must be fetched successfully before
    /// the transition happens; on failure the tracker stays idle.
    pub async fn start(&self) -> Result<DisplaySnapshot, TrackerError> {
        let slot = {
            let mut state = self.state.lock().await;
            if state.is_tracking() {
                return Err(TrackerError::AlreadyTracking);
            }
            let epoch = state.begin_fetch().ok_or(TrackerError::SampleInFlight)?;
            state.clear_error();
            FetchSlot::new(&self.state, epoch)
        };

        let outcome = self.fetch().await;

        let mut schedule = self.schedule.lock().await;
        let display = {
            let mut state = self.state.lock().await;
            if !slot.finish(&mut state) {
                info!("Start abandoned: tracking state changed while fetching first sample");
                return Err(TrackerError::Superseded);
            }

            let (position, reading) = match outcome {
                SampleOutcome::Success(position, reading) => (position, reading),
                SampleOutcome::LocationFailed(err) => {
                    return Err(self.fail_start(&mut state, err.into()));
                }
                SampleOutcome::FetchFailed(err) => {
                    return Err(self.fail_start(&mut state, err.into()));
                }
            };

            let now = self.clock.now();
            let session_id = Uuid::new_v4().to_string();
            if !state.begin_tracking(session_id.clone(), now) {
                return Err(TrackerError::AlreadyTracking);
            }
            let aqi = reading.aqi;
            state.ingest(position, reading, now);
            info!("Tracking started (session {session_id}, first AQI {aqi})");
            self.display_for(&state)
        };

        if let Some(previous) = schedule.take() {
            warn!("Replacing a sampling schedule that was still registered");
            if let Err(err) = previous.shutdown().await {
                error!("Failed to shut down previous schedule: {err:?}");
            }
        }
        *schedule = Some(SamplingSchedule::spawn(
            self.clone(),
            self.settings.sample_interval(),
            self.settings.tick_interval(),
        ));
        drop(schedule);

        self.display_tx.send_replace(display.clone());
        Ok(display)
    }

    /// Tracking -> Idle. Always succeeds. Suspends both periodic triggers and
    /// invalidates any fetch still outstanding.
    pub async fn stop(&self) -> DisplaySnapshot {
        let mut schedule_guard = self.schedule.lock().await;
        let stopped = {
            let mut state = self.state.lock().await;
            let now = self.clock.now();
            let stopped = state.stop(now);
            if !stopped && state.abandon_fetch() {
                info!("Stop requested while idle; pending fetch abandoned");
            }
            stopped
        };
        let schedule = schedule_guard.take();
        drop(schedule_guard);

        if let Some(schedule) = schedule {
            if let Err(err) = schedule.shutdown().await {
                error!("Failed to shut down sampling schedule: {err:?}");
            }
        }

        if stopped {
            info!("Tracking stopped");
            self.persist().await;
        }

        self.publish().await
    }

    /// One fetch-and-ingest cycle. Coalesced if another fetch is outstanding.
    pub async fn run_sample_cycle(&self) -> CycleOutcome {
        let slot = {
            let mut state = self.state.lock().await;
            if !state.is_tracking() {
                return CycleOutcome::NotTracking;
            }
            match state.begin_fetch() {
                Some(epoch) => FetchSlot::new(&self.state, epoch),
                None => {
                    debug!("Sample cycle skipped: previous fetch still in flight");
                    return CycleOutcome::Coalesced;
                }
            }
        };

        let outcome = self.fetch().await;

        let (result, display) = {
            let mut state = self.state.lock().await;
            if !slot.finish(&mut state) {
                info!("Discarding sample from a previous tracking period");
                return CycleOutcome::Stale;
            }

            let result = match outcome {
                SampleOutcome::Success(position, reading) => {
                    let aqi = reading.aqi;
                    let category = reading.category();
                    state.ingest(position, reading, self.clock.now());
                    info!("Sample ingested: AQI {aqi} ({})", category.label());
                    CycleOutcome::Ingested
                }
                failed => {
                    if let Some(message) = failed.error_message() {
                        self.show_error(&mut state, message);
                    }
                    CycleOutcome::Failed
                }
            };
            (result, self.display_for(&state))
        };

        self.display_tx.send_replace(display);
        result
    }

    /// Manual refresh. While tracking this is a regular cycle; while idle the
    /// sample only updates the latest conditions.
    pub async fn refresh(&self) -> CycleOutcome {
        if self.is_tracking().await {
            return self.run_sample_cycle().await;
        }

        let slot = {
            let mut state = self.state.lock().await;
            if state.is_tracking() {
                drop(state);
                return self.run_sample_cycle().await;
            }
            match state.begin_fetch() {
                Some(epoch) => FetchSlot::new(&self.state, epoch),
                None => return CycleOutcome::Coalesced,
            }
        };

        let outcome = self.fetch().await;

        let (result, display) = {
            let mut state = self.state.lock().await;
            if !slot.finish(&mut state) {
                return CycleOutcome::Stale;
            }
            let result = match outcome {
                SampleOutcome::Success(position, reading) => {
                    state.observe(position, reading);
                    CycleOutcome::Observed
                }
                failed => {
                    if let Some(message) = failed.error_message() {
                        self.show_error(&mut state, message);
                    }
                    CycleOutcome::Failed
                }
            };
            (result, self.display_for(&state))
        };

        self.display_tx.send_replace(display);
        result
    }

    /// Recompute live values (elapsed, good-air total) for display. Never
    /// touches the accumulators.
    pub async fn tick(&self) -> DisplaySnapshot {
        self.publish().await
    }

    /// Clear all statistics and history. Confirmation is the caller's job.
    pub async fn reset(&self) -> DisplaySnapshot {
        {
            let mut state = self.state.lock().await;
            state.reset();
        }
        info!("History cleared");
        self.persist().await;
        self.publish().await
    }

    /// Page visibility hook. Coming back into view while tracking refreshes.
    pub async fn set_visible(&self, visible: bool) -> Option<CycleOutcome> {
        let tracking = self.is_tracking().await;
        if !tracking {
            return None;
        }
        if visible {
            info!("Visible again, refreshing location");
            Some(self.refresh().await)
        } else {
            info!("Hidden, continuing tracking in background");
            None
        }
    }

    pub async fn hide_error(&self) {
        self.state.lock().await.clear_error();
        self.publish().await;
    }

    /// The tracker stays idle; the failure goes on display.
    fn fail_start(&self, state: &mut Session, err: TrackerError) -> TrackerError {
        self.show_error(state, format!("Location error: {err}"));
        self.display_tx.send_replace(self.display_for(state));
        err
    }

    async fn fetch(&self) -> SampleOutcome {
        fetch_sample(
            self.location.as_ref(),
            self.air_quality.as_ref(),
            self.settings.location_timeout(),
        )
        .await
    }

    /// Show `message` and schedule its expiry. Each notice clears whatever is
    /// on display when its own timer runs out.
    fn show_error(&self, state: &mut Session, message: String) {
        warn!("{message}");
        state.show_error(message, self.clock.now());

        let controller = self.clone();
        let expiry = self.settings.error_display();
        tokio::spawn(async move {
            tokio::time::sleep(expiry).await;
            controller.hide_error().await;
        });
    }

    async fn persist(&self) {
        let snapshot = self.snapshot().await;
        if let Err(err) = self.store.save(&snapshot) {
            error!("Failed to save session snapshot: {err:?}");
        }
    }

    async fn publish(&self) -> DisplaySnapshot {
        let display = {
            let state = self.state.lock().await;
            self.display_for(&state)
        };
        self.display_tx.send_replace(display.clone());
        display
    }

    fn display_for(&self, state: &Session) -> DisplaySnapshot {
        DisplaySnapshot::from_session(state, self.clock.now(), self.settings.history_display_limit)
    }
}

/// Claim on the session's single fetch slot, held across the provider await.
/// A caller that drops its future mid-fetch gives the slot back on drop.
struct FetchSlot {
    state: Arc<Mutex<Session>>,
    epoch: u64,
    settled: bool,
}

impl FetchSlot {
    fn new(state: &Arc<Mutex<Session>>, epoch: u64) -> Self {
        Self {
            state: Arc::clone(state),
            epoch,
            settled: false,
        }
    }

    /// Hand the slot back after the fetch resolved. False means the epoch
    /// moved on and the result must be discarded.
    fn finish(mut self, state: &mut Session) -> bool {
        self.settled = true;
        state.finish_fetch(self.epoch)
    }
}

impl Drop for FetchSlot {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let epoch = self.epoch;
        if let Ok(mut state) = self.state.try_lock() {
            if state.release_fetch(epoch) {
                debug!("Fetch dropped before completion; slot released");
            }
            return;
        }

        // Session busy: release once the lock frees up.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Fetch dropped outside a runtime; slot left for the next stop");
            return;
        };
        let state = Arc::clone(&self.state);
        runtime.spawn(async move {
            if state.lock().await.release_fetch(epoch) {
                debug!("Fetch dropped before completion; slot released");
            }
        });
    }
}
