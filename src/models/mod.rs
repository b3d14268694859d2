mod history;
mod position;
mod reading;

pub use history::{HistoryEntry, LatestConditions};
pub use position::{Coordinates, Position};
pub use reading::{Category, Reading};
