//! Single-city analytics payloads.
//!
//! These structures mirror the JSON shape returned by the remote `get_city_analysis`
//! and `get_city_forecast` calls (camelCase keys), so remote payloads and locally
//! synthesized snapshots are interchangeable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AqiLevel, CitySummary, Pollutant, Window};

/// One point of the historical trend series.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub aqi: u16,
    pub rolling_average: f64,
}

/// One projected AQI value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub projected_aqi: u16,
}

/// Short-term (hourly) and long-term (daily) projections.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub short_term: Vec<ForecastPoint>,
    pub long_term: Vec<ForecastPoint>,
}

/// Rank tag assigned to breakdown entries by descending concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollutantTier {
    Primary,
    Secondary,
    Minor,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollutantShare {
    pub pollutant: Pollutant,
    pub value: f64,
    pub unit: String,
    pub tier: PollutantTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorySeverity {
    Info,
    Caution,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAdvisory {
    pub severity: AdvisorySeverity,
    pub headline: String,
    pub description: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttribution {
    pub source: String,
    /// Confidence in `[0.4, 0.9]`.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WeatherMetric {
    Temperature,
    Humidity,
    WindSpeed,
    Precipitation,
    SurfacePressure,
}

impl WeatherMetric {
    pub fn label(&self) -> &'static str {
        match self {
            WeatherMetric::Temperature => "Temperature",
            WeatherMetric::Humidity => "Humidity",
            WeatherMetric::WindSpeed => "Wind speed",
            WeatherMetric::Precipitation => "Precipitation",
            WeatherMetric::SurfacePressure => "Surface pressure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherCorrelation {
    pub metric: WeatherMetric,
    /// Correlation coefficient in `[-0.8, 0.8]`.
    pub coefficient: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Flat,
    Rising,
    Improving,
}

/// Trailing "current" slice of the trend compared to the slice just before it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub current_average: f64,
    pub previous_average: f64,
    pub delta: f64,
    pub direction: TrendDirection,
    /// Points `>= 200` in the current slice.
    pub critical_points: usize,
    /// Points `>= 150` in the current slice.
    pub advisory_points: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureMetrics {
    pub estimated_population: u64,
    pub aqi_load_index: f64,
    pub exposure_hours: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMeta {
    pub window: Window,
    pub generated_at: DateTime<Utc>,
    pub level: AqiLevel,
}

/// Fully computed analytics payload for one city and window.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub city: CitySummary,
    pub trend_series: Vec<TrendPoint>,
    pub forecast: Forecast,
    pub pollutant_breakdown: Vec<PollutantShare>,
    pub health_advisories: Vec<HealthAdvisory>,
    pub source_attribution: Vec<SourceAttribution>,
    pub weather_correlation: Vec<WeatherCorrelation>,
    pub period_comparison: PeriodComparison,
    pub exposure: ExposureMetrics,
    pub meta: AnalysisMeta,
}

/// Payload of the `get_city_forecast` call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityForecastSummary {
    pub city: CitySummary,
    pub trend_series: Vec<TrendPoint>,
    pub forecast: Forecast,
    pub meta: AnalysisMeta,
}

impl From<AnalysisSnapshot> for CityForecastSummary {
    fn from(snapshot: AnalysisSnapshot) -> Self {
        Self {
            city: snapshot.city,
            trend_series: snapshot.trend_series,
            forecast: snapshot.forecast,
            meta: snapshot.meta,
        }
    }
}
