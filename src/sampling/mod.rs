pub mod fetch;
pub mod loop_worker;
pub mod schedule;

pub use fetch::{fetch_sample, SampleOutcome};
pub use schedule::SamplingSchedule;
