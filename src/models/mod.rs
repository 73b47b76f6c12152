//! Defines the data structures and models used throughout the application.
//!
//! This includes the reference city data, pollutant readings, and the analytics
//! payloads exchanged with the remote backend or produced by local synthesis.

mod analysis;
mod city;
mod overview;
mod pollutant;
mod snapshot;

pub use analysis::*;
pub use city::*;
pub use overview::*;
pub use pollutant::*;
pub use snapshot::*;
