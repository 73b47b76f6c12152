//! The AQI analytics and synthetic data engine.
//!
//! Includes:
//! - `aqi`: breakpoint AQI calculator and dominant-pollutant selection.
//! - `rng`: string-seeded deterministic generator.
//! - `catalog`: static city reference data.
//! - `city_analysis` / `overview`: local synthesis of single- and multi-city analytics.
//! - `dispatcher`: off-thread execution of single-city builds with timeout fallback.
//! - `cache`: TTL-bounded snapshot cache for the live-metrics path.
//! - `live`: synthesized current conditions used when the live feed is unreachable.

pub mod aqi;
pub mod cache;
pub mod catalog;
pub mod city_analysis;
pub mod dispatcher;
pub mod live;
pub mod overview;
pub mod rng;

pub use cache::{Clock, SnapshotCache, SystemClock};
pub use catalog::CityCatalog;
pub use dispatcher::{AnalysisDispatcher, DispatcherConfig};
pub use rng::SeededGenerator;
