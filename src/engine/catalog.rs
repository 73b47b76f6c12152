//! Static reference catalog of monitored cities.
//!
//! Loaded once at startup. Lookups are case-insensitive and unknown identifiers
//! resolve to the default city so that analytics always have something to render.

use std::collections::HashMap;
use tracing::debug;

use crate::models::{City, Coordinates, Pollutant};

/// Identifier of the city used when a lookup misses.
pub const DEFAULT_CITY_ID: &str = "delhi";

/// Size of the cohort used when a multi-city request names no known city.
pub const DEFAULT_COHORT_SIZE: usize = 6;

/// (id, name, region, country, lat, lon, baseline AQI, dominant pollutant, population)
type CityRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    f64,
    f64,
    f64,
    Pollutant,
    u64,
);

const CITY_ROWS: [CityRow; 12] = [
    ("delhi", "Delhi", "National Capital Territory", "IN", 28.6139, 77.2090, 182.0, Pollutant::Pm25, 32_941_000),
    ("mumbai", "Mumbai", "Maharashtra", "IN", 19.0760, 72.8777, 118.0, Pollutant::Pm10, 21_297_000),
    ("kolkata", "Kolkata", "West Bengal", "IN", 22.5726, 88.3639, 146.0, Pollutant::Pm25, 15_134_000),
    ("chennai", "Chennai", "Tamil Nadu", "IN", 13.0827, 80.2707, 84.0, Pollutant::No2, 11_776_000),
    ("bengaluru", "Bengaluru", "Karnataka", "IN", 12.9716, 77.5946, 76.0, Pollutant::No2, 13_608_000),
    ("hyderabad", "Hyderabad", "Telangana", "IN", 17.3850, 78.4867, 98.0, Pollutant::Pm10, 10_801_000),
    ("lucknow", "Lucknow", "Uttar Pradesh", "IN", 26.8467, 80.9462, 168.0, Pollutant::Pm25, 3_945_000),
    ("patna", "Patna", "Bihar", "IN", 25.5941, 85.1376, 174.0, Pollutant::Pm25, 2_589_000),
    ("ahmedabad", "Ahmedabad", "Gujarat", "IN", 23.0225, 72.5714, 124.0, Pollutant::Pm10, 8_650_000),
    ("pune", "Pune", "Maharashtra", "IN", 18.5204, 73.8567, 92.0, Pollutant::O3, 7_166_000),
    ("jaipur", "Jaipur", "Rajasthan", "IN", 26.9124, 75.7873, 132.0, Pollutant::Pm10, 4_107_000),
    ("kanpur", "Kanpur", "Uttar Pradesh", "IN", 26.4499, 80.3319, 188.0, Pollutant::Pm25, 3_200_000),
];

/// Immutable catalog of cities, indexed by lowercase identifier.
#[derive(Debug, Clone)]
pub struct CityCatalog {
    cities: Vec<City>,
    index: HashMap<String, usize>,
    default_idx: usize,
}

impl CityCatalog {
    /// Builds the catalog from the compiled-in city table.
    pub fn load() -> Self {
        let cities = CITY_ROWS
            .iter()
            .map(
                |&(id, name, region, country, latitude, longitude, baseline_aqi, dominant, population)| City {
                    id: id.to_string(),
                    name: name.to_string(),
                    region: region.to_string(),
                    country: country.to_string(),
                    coordinates: Coordinates {
                        latitude,
                        longitude,
                    },
                    baseline_aqi,
                    dominant_pollutant: dominant,
                    population,
                },
            )
            .collect();
        Self::from_cities(cities)
    }

    /// Builds a catalog from an explicit list. The first city is the default when
    /// `delhi` is absent. The list must not be empty.
    pub fn from_cities(cities: Vec<City>) -> Self {
        assert!(!cities.is_empty(), "city catalog cannot be empty");
        let index: HashMap<String, usize> = cities
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.to_ascii_lowercase(), i))
            .collect();
        let default_idx = index.get(DEFAULT_CITY_ID).copied().unwrap_or(0);
        debug!("Loaded city catalog with {} cities", cities.len());
        Self {
            cities,
            index,
            default_idx,
        }
    }

    pub fn get(&self, id: &str) -> Option<&City> {
        self.index
            .get(&id.trim().to_ascii_lowercase())
            .map(|&i| &self.cities[i])
    }

    /// Looks up a city, substituting the default city for unknown identifiers.
    pub fn resolve(&self, id: &str) -> &City {
        self.get(id).unwrap_or_else(|| {
            let fallback = self.default_city();
            debug!("Unknown city id '{}', falling back to {}", id, fallback.id);
            fallback
        })
    }

    pub fn default_city(&self) -> &City {
        &self.cities[self.default_idx]
    }

    pub fn default_cohort(&self) -> Vec<&City> {
        self.cities.iter().take(DEFAULT_COHORT_SIZE).collect()
    }

    /// Resolves a cohort: unknown and duplicate ids are dropped, and an empty
    /// result becomes the default cohort.
    pub fn resolve_cohort<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&City> {
        let mut cohort: Vec<&City> = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(city) = self.get(id.as_ref()) {
                if !cohort.iter().any(|c| c.id == city.id) {
                    cohort.push(city);
                }
            }
        }
        if cohort.is_empty() {
            debug!("No known cities in cohort request, using default cohort");
            return self.default_cohort();
        }
        cohort
    }

    pub fn all(&self) -> &[City] {
        &self.cities
    }
}

impl Default for CityCatalog {
    fn default() -> Self {
        Self::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        let catalog = CityCatalog::load();
        assert_eq!(catalog.resolve("  Mumbai ").id, "mumbai");
    }

    #[test]
    fn test_unknown_city_falls_back_to_default() {
        let catalog = CityCatalog::load();
        assert!(catalog.get("atlantis").is_none());
        assert_eq!(catalog.resolve("atlantis").id, DEFAULT_CITY_ID);
    }

    #[test]
    fn test_resolve_cohort() {
        let catalog = CityCatalog::load();
        let cohort = catalog.resolve_cohort(&["pune", "nowhere", "PUNE", "patna"]);
        let ids: Vec<&str> = cohort.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["pune", "patna"]);

        let empty: [&str; 0] = [];
        assert_eq!(catalog.resolve_cohort(&empty).len(), DEFAULT_COHORT_SIZE);
        assert_eq!(catalog.resolve_cohort(&["unknown"]).len(), DEFAULT_COHORT_SIZE);
    }
}
