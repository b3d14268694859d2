//! Where session snapshots go between runs. The tracker only needs `save` and
//! `load`; the storage medium is up to the host.

use std::sync::Mutex;

use anyhow::{Context, Result};
use log::info;

use crate::tracker::SessionSnapshot;

pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;
    fn load(&self) -> Result<Option<SessionSnapshot>>;
}

/// Logs what would be saved and never has anything to load.
#[derive(Debug, Default)]
pub struct LoggingSnapshotStore;

impl SnapshotStore for LoggingSnapshotStore {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let serialized =
            serde_json::to_string(snapshot).context("failed to serialize session snapshot")?;
        info!(
            "Would save session snapshot ({} readings, {} history entries, {} bytes)",
            snapshot.locations_checked(),
            snapshot.history().len(),
            serialized.len()
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionSnapshot>> {
        info!("Loading session snapshot: nothing stored");
        Ok(None)
    }
}

/// Keeps the last snapshot as JSON in memory.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    saved: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_json(&self) -> Option<String> {
        self.saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let serialized =
            serde_json::to_string(snapshot).context("failed to serialize session snapshot")?;
        *self
            .saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(serialized);
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionSnapshot>> {
        self.saved_json()
            .map(|json| {
                serde_json::from_str(&json).context("failed to deserialize session snapshot")
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Session;

    #[test]
    fn logging_store_loads_nothing() {
        let store = LoggingSnapshotStore;
        store.save(&Session::default()).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn memory_store_returns_last_save() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().unwrap().is_none());

        let session = Session::default();
        store.save(&session).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.locations_checked(), 0);
        assert!(store.saved_json().unwrap().contains("\"goodAirAccumulatedMs\":0"));
    }
}
