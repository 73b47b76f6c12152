//! Local synthesis of the multi-city comparative overview.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::f64::consts::TAU;
use tracing::debug;

use super::catalog::CityCatalog;
use super::city_analysis::{clamp_aqi, facet_seed, pollutant_breakdown, round_to, weather_correlation};
use super::rng::SeededGenerator;
use crate::models::{
    AqiLevel, City, CityMatrixEntry, CorrelationInsight, CumulativeImpact, LeaderboardEntry,
    Leaderboards, MultiCityOverview, OverviewMeta, Pollutant, PollutantConcentration,
    PollutantMatrixRow, TemporalPatterns, TemporalPoint, WeatherMetric, Window,
};

const LEADERBOARD_SIZE: usize = 4;
const HAZARDOUS_AQI: u16 = 200;
const HOURS_PER_HAZARDOUS_CITY: usize = 6;

const INSIGHT_WEATHER_METRICS: [WeatherMetric; 4] = [
    WeatherMetric::Temperature,
    WeatherMetric::Humidity,
    WeatherMetric::WindSpeed,
    WeatherMetric::Precipitation,
];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Builds the overview for a cohort. Unknown ids are dropped; an empty or fully
/// unknown cohort becomes the default cohort.
pub fn build_multi_city_overview<S: AsRef<str>>(
    catalog: &CityCatalog,
    city_ids: &[S],
    window: Window,
    now: DateTime<Utc>,
) -> MultiCityOverview {
    let cohort = catalog.resolve_cohort(city_ids);
    debug!(
        "Synthesizing {} overview for {} cities",
        window,
        cohort.len()
    );

    // Each entry only depends on its own seeds, so parallel evaluation keeps the output stable.
    let matrix: Vec<CityMatrixEntry> = cohort
        .par_iter()
        .map(|city| matrix_entry(city, window))
        .collect();

    let correlation_insights = cohort
        .iter()
        .map(|city| CorrelationInsight {
            city_id: city.id.clone(),
            city_name: city.name.clone(),
            correlations: weather_correlation(
                &facet_seed(&city.id, window, "correlations"),
                &INSIGHT_WEATHER_METRICS,
            ),
        })
        .collect();

    let cohort_key = cohort
        .iter()
        .map(|c| c.id.as_str())
        .collect::<Vec<_>>()
        .join(",");

    MultiCityOverview {
        leaderboards: leaderboards(&matrix),
        pollutant_matrix: pollutant_matrix(&matrix),
        correlation_insights,
        temporal_patterns: temporal_patterns(&matrix, &cohort_key, window),
        cumulative_impact: cumulative_impact(&matrix),
        meta: OverviewMeta {
            window,
            generated_at: now,
            cohort_size: matrix.len(),
        },
        matrix,
    }
}

fn matrix_entry(city: &City, window: Window) -> CityMatrixEntry {
    let mut rng = SeededGenerator::new(&facet_seed(&city.id, window, "overview"));
    let change = round_to(rng.spread(20.0), 1);
    let aqi = clamp_aqi(city.baseline_aqi + change);
    let pollutants = pollutant_breakdown(city, &facet_seed(&city.id, window, "overview-pollutants"));

    CityMatrixEntry {
        city_id: city.id.clone(),
        city_name: city.name.clone(),
        region: city.region.clone(),
        aqi,
        change,
        level: AqiLevel::from_aqi(aqi as f64),
        dominant_pollutant: pollutants.first().map(|s| s.pollutant),
        population: city.population,
        pollutants,
    }
}

fn leaderboard_entry(entry: &CityMatrixEntry) -> LeaderboardEntry {
    LeaderboardEntry {
        city_id: entry.city_id.clone(),
        city_name: entry.city_name.clone(),
        delta: entry.change,
        current_aqi: entry.aqi,
        level: entry.level,
    }
}

/// Lowest changes are "improving", highest are "deteriorating"; at most four each.
pub fn leaderboards(matrix: &[CityMatrixEntry]) -> Leaderboards {
    let mut ranked: Vec<&CityMatrixEntry> = matrix.iter().collect();
    ranked.sort_by(|a, b| a.change.total_cmp(&b.change));

    let improving = ranked
        .iter()
        .take(LEADERBOARD_SIZE)
        .map(|e| leaderboard_entry(e))
        .collect();
    let deteriorating = ranked
        .iter()
        .rev()
        .take(LEADERBOARD_SIZE)
        .map(|e| leaderboard_entry(e))
        .collect();

    Leaderboards {
        improving,
        deteriorating,
    }
}

fn pollutant_matrix(matrix: &[CityMatrixEntry]) -> Vec<PollutantMatrixRow> {
    matrix
        .iter()
        .map(|entry| PollutantMatrixRow {
            city_id: entry.city_id.clone(),
            city_name: entry.city_name.clone(),
            concentrations: Pollutant::ALL
                .iter()
                .map(|&pollutant| PollutantConcentration {
                    pollutant,
                    value: entry
                        .pollutants
                        .iter()
                        .find(|s| s.pollutant == pollutant)
                        .map(|s| s.value)
                        .unwrap_or(0.0),
                })
                .collect(),
        })
        .collect()
}

fn cohort_mean(matrix: &[CityMatrixEntry]) -> f64 {
    if matrix.is_empty() {
        return 0.0;
    }
    matrix.iter().map(|e| e.aqi as f64).sum::<f64>() / matrix.len() as f64
}

/// Hourly (24) and weekly (7) average-AQI curves around the cohort mean.
pub fn temporal_patterns(
    matrix: &[CityMatrixEntry],
    cohort_key: &str,
    window: Window,
) -> TemporalPatterns {
    let mut rng = SeededGenerator::new(&format!("{}-{}-temporal", cohort_key, window.key()));
    let base = cohort_mean(matrix);

    let hourly = (0..24)
        .map(|hour| {
            let seasonal = 20.0 * (TAU * hour as f64 / 24.0).sin();
            TemporalPoint {
                label: format!("{:02}:00", hour),
                average_aqi: clamp_aqi(base + seasonal + rng.spread(8.0)),
            }
        })
        .collect();

    let weekly = WEEKDAYS
        .iter()
        .enumerate()
        .map(|(day, label)| {
            let seasonal = 14.0 * (TAU * day as f64 / 7.0).cos();
            TemporalPoint {
                label: label.to_string(),
                average_aqi: clamp_aqi(base + seasonal + rng.spread(8.0)),
            }
        })
        .collect();

    TemporalPatterns { hourly, weekly }
}

/// Cohort-wide totals derived from the matrix.
pub fn cumulative_impact(matrix: &[CityMatrixEntry]) -> CumulativeImpact {
    let cohort_size = matrix.len();
    let hazardous = matrix.iter().filter(|e| e.aqi >= HAZARDOUS_AQI).count();
    let population_exposed: f64 = matrix
        .iter()
        .map(|e| e.population as f64 * (e.aqi as f64 / 500.0))
        .sum();

    CumulativeImpact {
        average_aqi: cohort_mean(matrix).round() as u16,
        hazardous_hours: HOURS_PER_HAZARDOUS_CITY * hazardous,
        alerts_issued: 2 * hazardous + (0.6 * (cohort_size - hazardous) as f64).round() as usize,
        population_exposed: population_exposed.round() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::catalog::DEFAULT_COHORT_SIZE;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, 9, 0, 0).unwrap()
    }

    fn entry(id: &str, aqi: u16, change: f64, population: u64) -> CityMatrixEntry {
        CityMatrixEntry {
            city_id: id.to_string(),
            city_name: id.to_uppercase(),
            region: "Test".to_string(),
            aqi,
            change,
            level: AqiLevel::from_aqi(aqi as f64),
            dominant_pollutant: None,
            population,
            pollutants: Vec::new(),
        }
    }

    #[test]
    fn test_leaderboard_sizes_and_cohort_average() {
        let catalog = CityCatalog::load();
        let all: Vec<&str> = catalog.all().iter().map(|c| c.id.as_str()).collect();
        for size in 1..=all.len() {
            let overview =
                build_multi_city_overview(&catalog, &all[..size], Window::Days7, fixed_now());
            assert_eq!(overview.matrix.len(), size);
            assert!(overview.leaderboards.improving.len() <= 4);
            assert!(overview.leaderboards.deteriorating.len() <= 4);

            let mean = overview.matrix.iter().map(|e| e.aqi as f64).sum::<f64>()
                / overview.matrix.len() as f64;
            assert_eq!(overview.cumulative_impact.average_aqi, mean.round() as u16);
        }
    }

    #[test]
    fn test_empty_and_unknown_cohorts_use_default() {
        let catalog = CityCatalog::load();
        let none: [&str; 0] = [];
        let empty = build_multi_city_overview(&catalog, &none, Window::Hours24, fixed_now());
        let unknown =
            build_multi_city_overview(&catalog, &["narnia", "oz"], Window::Hours24, fixed_now());
        assert_eq!(empty.meta.cohort_size, DEFAULT_COHORT_SIZE);
        assert_eq!(empty, unknown);
    }

    #[test]
    fn test_overview_is_pure_for_cohort_and_window() {
        let catalog = CityCatalog::load();
        let ids = ["delhi", "pune", "chennai"];
        let a = build_multi_city_overview(&catalog, &ids, Window::Days30, fixed_now());
        let b = build_multi_city_overview(&catalog, &ids, Window::Days30, fixed_now());
        assert_eq!(a, b);
        assert_eq!(a.temporal_patterns.hourly.len(), 24);
        assert_eq!(a.temporal_patterns.weekly.len(), 7);
        assert_eq!(a.correlation_insights.len(), 3);
        assert!(a.correlation_insights.iter().all(|c| c.correlations.len() == 4));
        assert!(a
            .pollutant_matrix
            .iter()
            .all(|row| row.concentrations.len() == Pollutant::ALL.len()));
    }

    #[test]
    fn test_leaderboard_ordering() {
        let matrix = vec![
            entry("a", 100, 5.0, 1),
            entry("b", 100, -12.0, 1),
            entry("c", 100, 18.0, 1),
            entry("d", 100, -3.0, 1),
            entry("e", 100, 0.5, 1),
            entry("f", 100, 9.0, 1),
        ];
        let boards = leaderboards(&matrix);
        let improving: Vec<&str> = boards.improving.iter().map(|e| e.city_id.as_str()).collect();
        let deteriorating: Vec<&str> = boards
            .deteriorating
            .iter()
            .map(|e| e.city_id.as_str())
            .collect();
        assert_eq!(improving, vec!["b", "d", "e", "a"]);
        assert_eq!(deteriorating, vec!["c", "f", "a", "e"]);
    }

    #[test]
    fn test_cumulative_impact_formulae() {
        let matrix = vec![
            entry("a", 250, 0.0, 1_000_000),
            entry("b", 200, 0.0, 500_000),
            entry("c", 100, 0.0, 2_000_000),
            entry("d", 50, 0.0, 100_000),
            entry("e", 60, 0.0, 0),
        ];
        let impact = cumulative_impact(&matrix);
        assert_eq!(impact.average_aqi, 132);
        assert_eq!(impact.hazardous_hours, 12);
        // 2 * 2 + round(0.6 * 3) = 4 + 2
        assert_eq!(impact.alerts_issued, 6);
        // 500000 + 200000 + 400000 + 10000
        assert_eq!(impact.population_exposed, 1_110_000);
    }
}
