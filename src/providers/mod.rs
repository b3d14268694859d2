//! Capabilities the tracker samples from. Both are external collaborators;
//! the simulators here are what the console host runs with.

pub mod air_quality;
pub mod location;

pub use air_quality::{AirQualityProvider, FetchError, SimulatedAirQuality};
pub use location::{LocationError, LocationProvider, SimulatedLocation};
