use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AqiLevel, Pollutant, PollutantReading};

/// Latest per-city air-quality state used by the live-metrics path.
///
/// This is what the snapshot cache stores, keyed by `city_id`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySnapshot {
    pub city_id: String,
    pub city_name: String,
    pub aqi: u16,
    pub dominant_pollutant: Option<Pollutant>,
    pub level: AqiLevel,
    #[serde(default)]
    pub readings: Vec<PollutantReading>,
    pub observed_at: DateTime<Utc>,
}
