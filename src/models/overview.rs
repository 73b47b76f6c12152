//! Multi-city comparative analytics payloads (`get_multi_city_overview`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AqiLevel, Pollutant, PollutantShare, WeatherCorrelation, Window};

/// Per-city row of the comparison matrix.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityMatrixEntry {
    pub city_id: String,
    pub city_name: String,
    pub region: String,
    pub aqi: u16,
    /// Synthetic change versus the previous period, in AQI points.
    pub change: f64,
    pub level: AqiLevel,
    pub dominant_pollutant: Option<Pollutant>,
    pub population: u64,
    pub pollutants: Vec<PollutantShare>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub city_id: String,
    pub city_name: String,
    pub delta: f64,
    pub current_aqi: u16,
    pub level: AqiLevel,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboards {
    pub improving: Vec<LeaderboardEntry>,
    pub deteriorating: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollutantConcentration {
    pub pollutant: Pollutant,
    pub value: f64,
}

/// Concentrations for one city in fixed pollutant order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollutantMatrixRow {
    pub city_id: String,
    pub city_name: String,
    pub concentrations: Vec<PollutantConcentration>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationInsight {
    pub city_id: String,
    pub city_name: String,
    pub correlations: Vec<WeatherCorrelation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalPoint {
    pub label: String,
    pub average_aqi: u16,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalPatterns {
    pub hourly: Vec<TemporalPoint>,
    pub weekly: Vec<TemporalPoint>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeImpact {
    pub average_aqi: u16,
    pub hazardous_hours: usize,
    pub alerts_issued: usize,
    pub population_exposed: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewMeta {
    pub window: Window,
    pub generated_at: DateTime<Utc>,
    pub cohort_size: usize,
}

/// Aggregate analytics across a city cohort.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiCityOverview {
    pub matrix: Vec<CityMatrixEntry>,
    pub leaderboards: Leaderboards,
    pub pollutant_matrix: Vec<PollutantMatrixRow>,
    pub correlation_insights: Vec<CorrelationInsight>,
    pub temporal_patterns: TemporalPatterns,
    pub cumulative_impact: CumulativeImpact,
    pub meta: OverviewMeta,
}
