use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{HistoryEntry, LatestConditions};

use super::format::format_duration;
use super::state::{ErrorNotice, Session, TrackingStatus};

/// Everything a presentation layer reads on each tick. Derived from a
/// `Session` and never written back.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySnapshot {
    pub status: TrackingStatus,
    pub session_id: Option<String>,
    pub elapsed_ms: u64,
    pub elapsed_text: String,
    pub good_air_ms: u64,
    pub good_air_text: String,
    pub locations_checked: u64,
    pub average_aqi: Option<u32>,
    pub latest: Option<LatestConditions>,
    pub history: Vec<HistoryEntry>,
    pub last_error: Option<ErrorNotice>,
}

impl DisplaySnapshot {
    pub fn from_session(session: &Session, now: DateTime<Utc>, history_limit: usize) -> Self {
        let elapsed_ms = session.elapsed_ms(now);
        let good_air_ms = session.live_good_air_ms(now);

        Self {
            status: session.status(),
            session_id: session.session_id().map(str::to_owned),
            elapsed_ms,
            elapsed_text: format_duration(elapsed_ms),
            good_air_ms,
            good_air_text: format_duration(good_air_ms),
            locations_checked: session.locations_checked(),
            average_aqi: session.average_aqi(),
            latest: session.latest().cloned(),
            history: session.history().iter().take(history_limit).cloned().collect(),
            last_error: session.last_error().cloned(),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.status == TrackingStatus::Tracking
    }

    /// One-line summary for console output.
    pub fn status_line(&self) -> String {
        let status = match self.status {
            TrackingStatus::Tracking => "Tracking",
            TrackingStatus::Idle => "Stopped",
        };
        let conditions = self
            .latest
            .as_ref()
            .map(|latest| format!("{} @ {}", latest.summary(), latest.position.coordinates_text()))
            .unwrap_or_else(|| "no reading yet".to_string());
        let average = self
            .average_aqi
            .map(|aqi| aqi.to_string())
            .unwrap_or_else(|| "--".to_string());

        let mut line = format!(
            "[{status}] {conditions} | session {} | good air {} | checked {} | avg AQI {average}",
            self.elapsed_text, self.good_air_text, self.locations_checked
        );
        if let Some(notice) = &self.last_error {
            line.push_str(" | ");
            line.push_str(&notice.message);
        }
        line
    }
}

impl Default for DisplaySnapshot {
    fn default() -> Self {
        Self::from_session(&Session::default(), Utc::now(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, Position, Reading};
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn ingest(session: &mut Session, aqi: u32, at: DateTime<Utc>) {
        let position = Position {
            latitude: 1.0,
            longitude: 2.0,
            accuracy: 5.0,
            timestamp: at,
        };
        let reading = Reading {
            aqi,
            pollutants: BTreeMap::new(),
            location: Coordinates {
                latitude: 1.0,
                longitude: 2.0,
            },
            observed_at: at,
        };
        session.ingest(position, reading, at);
    }

    #[test]
    fn live_values_include_open_interval() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let mut session = Session::default();
        session.begin_tracking("abc".into(), start);
        ingest(&mut session, 30, start);

        let display = DisplaySnapshot::from_session(&session, start + Duration::seconds(3_661), 50);
        assert!(display.is_tracking());
        assert_eq!(display.elapsed_text, "1:01:01");
        assert_eq!(display.good_air_text, "1:01:01");
        assert_eq!(display.locations_checked, 1);
        assert_eq!(display.average_aqi, Some(30));
        assert_eq!(
            display.latest.as_ref().map(|l| l.summary()),
            Some("AQI: 30 - Good".to_string())
        );
    }

    #[test]
    fn history_is_limited_for_display() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let mut session = Session::default();
        session.begin_tracking("abc".into(), start);
        for i in 0..80 {
            ingest(&mut session, 60, start + Duration::seconds(i));
        }
        let display = DisplaySnapshot::from_session(&session, start, 50);
        assert_eq!(display.history.len(), 50);
        assert_eq!(session.history().len(), 80);
    }

    #[test]
    fn idle_status_line() {
        let display = DisplaySnapshot::default();
        assert!(!display.is_tracking());
        assert!(display.status_line().starts_with("[Stopped] no reading yet"));
    }
}
