use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{HistoryEntry, LatestConditions, Position, Reading};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

/// Milliseconds from `from` to `to`. A clock that went backwards yields zero.
fn span_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackingStatus {
    Idle,
    Tracking,
}

impl Default for TrackingStatus {
    fn default() -> Self {
        TrackingStatus::Idle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub message: String,
    pub shown_at: DateTime<Utc>,
}

/// Accounting state for one tracker. Pure: every time-dependent method takes
/// `now` from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    status: TrackingStatus,
    session_id: Option<String>,
    session_start: Option<DateTime<Utc>>,
    /// Elapsed time frozen at the last stop; shown while idle.
    last_elapsed_ms: Option<u64>,
    /// Closed good-air intervals only.
    good_air_accumulated_ms: u64,
    current_good_interval_start: Option<DateTime<Utc>>,
    locations_checked: u64,
    aqi_readings: Vec<u32>,
    /// Most recent first.
    history: VecDeque<HistoryEntry>,
    latest: Option<LatestConditions>,
    last_error: Option<ErrorNotice>,
    #[serde(skip, default = "default_history_capacity")]
    history_capacity: usize,
    /// Bumped on every start and stop. A fetch tagged with an older epoch
    /// must not touch the session.
    #[serde(skip)]
    epoch: u64,
    #[serde(skip)]
    fetch_in_flight: bool,
}

/// The serialisable form handed to a `SnapshotStore`.
pub type SessionSnapshot = Session;

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl Session {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            status: TrackingStatus::Idle,
            session_id: None,
            session_start: None,
            last_elapsed_ms: None,
            good_air_accumulated_ms: 0,
            current_good_interval_start: None,
            locations_checked: 0,
            aqi_readings: Vec::new(),
            history: VecDeque::with_capacity(history_capacity.min(DEFAULT_HISTORY_CAPACITY)),
            latest: None,
            last_error: None,
            history_capacity: history_capacity.max(1),
            epoch: 0,
            fetch_in_flight: false,
        }
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn is_tracking(&self) -> bool {
        self.status == TrackingStatus::Tracking
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session_start
    }

    pub fn good_air_accumulated_ms(&self) -> u64 {
        self.good_air_accumulated_ms
    }

    pub fn current_good_interval_start(&self) -> Option<DateTime<Utc>> {
        self.current_good_interval_start
    }

    pub fn locations_checked(&self) -> u64 {
        self.locations_checked
    }

    pub fn aqi_readings(&self) -> &[u32] {
        &self.aqi_readings
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.history
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn latest(&self) -> Option<&LatestConditions> {
        self.latest.as_ref()
    }

    pub fn last_error(&self) -> Option<&ErrorNotice> {
        self.last_error.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_fetch_in_flight(&self) -> bool {
        self.fetch_in_flight
    }

    /// Idle -> Tracking. Returns false if already tracking.
    ///
    /// Callers must only invoke this once the first sample has been fetched,
    /// and should ingest that sample straight after.
    pub fn begin_tracking(&mut self, session_id: String, now: DateTime<Utc>) -> bool {
        if self.is_tracking() {
            return false;
        }
        self.status = TrackingStatus::Tracking;
        self.session_id = Some(session_id);
        self.session_start = Some(now);
        self.last_elapsed_ms = None;
        self.epoch = self.epoch.wrapping_add(1);
        self.fetch_in_flight = false;
        true
    }

    /// Tracking -> Idle. Folds an open good-air interval into the total.
    /// Returns false if already idle.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_tracking() {
            return false;
        }
        self.close_good_interval(now);
        self.last_elapsed_ms = Some(self.elapsed_ms(now));
        self.status = TrackingStatus::Idle;
        self.session_start = None;
        self.epoch = self.epoch.wrapping_add(1);
        self.fetch_in_flight = false;
        true
    }

    /// Account for one sample. Rejected (returns false) while idle.
    pub fn ingest(&mut self, position: Position, reading: Reading, now: DateTime<Utc>) -> bool {
        if !self.is_tracking() {
            return false;
        }

        let category = reading.category();
        if category.is_good() {
            if self.current_good_interval_start.is_none() {
                self.current_good_interval_start = Some(now);
            }
        } else {
            self.close_good_interval(now);
        }

        self.locations_checked += 1;
        self.aqi_readings.push(reading.aqi);

        self.history.push_front(HistoryEntry::new(&position, &reading, now));
        while self.history.len() > self.history_capacity {
            self.history.pop_back();
        }

        self.latest = Some(LatestConditions::new(position, reading));
        true
    }

    /// Record a sample for display without accounting for it.
    pub fn observe(&mut self, position: Position, reading: Reading) {
        self.latest = Some(LatestConditions::new(position, reading));
    }

    /// Clear accumulators, history and latest conditions. Tracking status and
    /// session start are left alone.
    pub fn reset(&mut self) {
        self.history.clear();
        self.good_air_accumulated_ms = 0;
        self.current_good_interval_start = None;
        self.locations_checked = 0;
        self.aqi_readings.clear();
        self.latest = None;
        self.last_elapsed_ms = None;
    }

    /// Closed good-air time plus the open interval, if any, up to `now`.
    pub fn live_good_air_ms(&self, now: DateTime<Utc>) -> u64 {
        let open = self
            .current_good_interval_start
            .map(|start| span_ms(start, now))
            .unwrap_or(0);
        self.good_air_accumulated_ms.saturating_add(open)
    }

    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        match self.session_start {
            Some(start) => span_ms(start, now),
            None => self.last_elapsed_ms.unwrap_or(0),
        }
    }

    /// Mean of every reading this session, rounded half up.
    pub fn average_aqi(&self) -> Option<u32> {
        if self.aqi_readings.is_empty() {
            return None;
        }
        let count = self.aqi_readings.len() as u64;
        let sum: u64 = self.aqi_readings.iter().map(|&aqi| u64::from(aqi)).sum();
        Some(((2 * sum + count) / (2 * count)) as u32)
    }

    /// Claim the single fetch slot. Returns the epoch to tag the fetch with, or
    /// `None` if another fetch is still outstanding.
    pub fn begin_fetch(&mut self) -> Option<u64> {
        if self.fetch_in_flight {
            return None;
        }
        self.fetch_in_flight = true;
        Some(self.epoch)
    }

    /// Release the fetch slot. Returns false when the epoch moved on since
    /// `begin_fetch`, in which case the result must be discarded.
    pub fn finish_fetch(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.fetch_in_flight = false;
        true
    }

    /// Give the slot back after a fetch that never completed. Only the owner
    /// of the current epoch can release it.
    pub fn release_fetch(&mut self, epoch: u64) -> bool {
        if !self.fetch_in_flight || epoch != self.epoch {
            return false;
        }
        self.fetch_in_flight = false;
        true
    }

    /// Invalidate an outstanding fetch without a state transition, e.g. a
    /// stop requested while the first sample of a start is still pending.
    pub fn abandon_fetch(&mut self) -> bool {
        if !self.fetch_in_flight {
            return false;
        }
        self.epoch = self.epoch.wrapping_add(1);
        self.fetch_in_flight = false;
        true
    }

    pub fn show_error(&mut self, message: String, now: DateTime<Utc>) {
        self.last_error = Some(ErrorNotice {
            message,
            shown_at: now,
        });
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Adopt the persisted accumulators of `snapshot`. Tracking state is never
    /// restored, and an interval left open in the snapshot is dropped.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.good_air_accumulated_ms = snapshot.good_air_accumulated_ms;
        self.current_good_interval_start = None;
        self.locations_checked = snapshot.aqi_readings.len() as u64;
        self.aqi_readings = snapshot.aqi_readings;
        self.history = snapshot.history;
        self.history.truncate(self.history_capacity);
        self.latest = snapshot.latest;
        self.last_elapsed_ms = snapshot.last_elapsed_ms;
    }

    fn close_good_interval(&mut self, now: DateTime<Utc>) {
        if let Some(start) = self.current_good_interval_start.take() {
            self.good_air_accumulated_ms = self
                .good_air_accumulated_ms
                .saturating_add(span_ms(start, now));
        }
    }
}
