use thiserror::Error;

use crate::providers::{FetchError, LocationError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrackerError {
    #[error("tracking already active")]
    AlreadyTracking,
    #[error("a sample fetch is already in flight")]
    SampleInFlight,
    /// The session was stopped or restarted while the fetch was outstanding.
    #[error("sample discarded: tracking state changed while it was in flight")]
    Superseded,
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
