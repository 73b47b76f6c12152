use serde::{Deserialize, Serialize};

use super::Pollutant;

/// Represents geographical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Immutable reference data for a monitored city.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: String,
    pub name: String,
    pub region: String,
    pub country: String,
    pub coordinates: Coordinates,
    /// Typical AQI for the city, used as the centre of synthesized series.
    pub baseline_aqi: f64,
    pub dominant_pollutant: Pollutant,
    pub population: u64,
}

/// Compact city descriptor embedded in analysis payloads.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySummary {
    pub id: String,
    pub name: String,
    pub region: String,
    pub country: String,
    pub coordinates: Coordinates,
    pub current_aqi: u16,
    pub dominant_pollutant: Option<Pollutant>,
}

impl CitySummary {
    pub fn from_city(city: &City, current_aqi: u16, dominant_pollutant: Option<Pollutant>) -> Self {
        Self {
            id: city.id.clone(),
            name: city.name.clone(),
            region: city.region.clone(),
            country: city.country.clone(),
            coordinates: city.coordinates,
            current_aqi,
            dominant_pollutant,
        }
    }
}
