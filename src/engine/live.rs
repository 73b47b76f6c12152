//! Synthesized "current conditions" for a city when no live feed is reachable.

use chrono::{DateTime, Utc};
use rand::Rng;

use super::aqi;
use super::rng::SeededGenerator;
use crate::models::{AqiLevel, City, CitySnapshot, Pollutant, PollutantReading};

/// Concentration (µg/m³) that roughly corresponds to AQI 100 for each pollutant.
fn reference_concentration(pollutant: Pollutant) -> f64 {
    match pollutant {
        Pollutant::Pm25 => 35.4,
        Pollutant::Pm10 => 154.0,
        Pollutant::No2 => 70.0,
        Pollutant::So2 => 40.0,
        Pollutant::O3 => 90.0,
        Pollutant::Co => 600.0,
    }
}

/// Builds a plausible snapshot around the city baseline.
///
/// Readings are seeded by city and hour, so repeated calls within the same hour agree.
pub fn synthesize_live_snapshot(city: &City, now: DateTime<Utc>) -> CitySnapshot {
    let hour_bucket = now.timestamp().div_euclid(3600);
    let mut rng = SeededGenerator::new(&format!("{}-live-{}", city.id, hour_bucket));
    let scale = city.baseline_aqi / 100.0;

    let readings: Vec<PollutantReading> = Pollutant::ALL
        .iter()
        .map(|&pollutant| {
            let boost = if pollutant == city.dominant_pollutant {
                1.2
            } else {
                1.0
            };
            let jitter: f64 = rng.gen_range(0.7..1.3);
            let value = reference_concentration(pollutant) * scale * boost * jitter;
            PollutantReading::new(pollutant, (value * 10.0).round() / 10.0, now)
        })
        .collect();

    let summary = aqi::summarize_readings(&readings);
    CitySnapshot {
        city_id: city.id.clone(),
        city_name: city.name.clone(),
        aqi: summary.aqi,
        dominant_pollutant: summary.dominant_pollutant,
        level: AqiLevel::from_aqi(summary.aqi as f64),
        readings,
        observed_at: now,
    }
}
