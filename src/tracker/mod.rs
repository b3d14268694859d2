pub mod controller;
pub mod display;
pub mod error;
pub mod format;
pub mod state;

pub use controller::{CycleOutcome, TrackerController};
pub use display::DisplaySnapshot;
pub use error::TrackerError;
pub use format::format_duration;
pub use state::{ErrorNotice, Session, SessionSnapshot, TrackingStatus};
