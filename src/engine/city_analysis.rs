//! Local synthesis of single-city analytics.
//!
//! Every facet draws from its own [`SeededGenerator`] keyed by
//! `"{city_id}-{window}-{facet}"`, so a snapshot is fully reproducible for a given
//! city and window apart from its timestamps.

use chrono::{DateTime, Duration, DurationRound, Utc};
use std::f64::consts::TAU;
use tracing::debug;

use super::catalog::CityCatalog;
use super::rng::SeededGenerator;
use crate::models::{
    AdvisorySeverity, AnalysisMeta, AnalysisSnapshot, AqiLevel, City, CitySummary,
    ExposureMetrics, Forecast, ForecastPoint, HealthAdvisory, PeriodComparison, Pollutant,
    PollutantShare, PollutantTier, SourceAttribution, TrendDirection, TrendPoint,
    WeatherCorrelation, WeatherMetric, Window,
};

pub(crate) const MIN_AQI: f64 = 20.0;
pub(crate) const MAX_AQI: f64 = 420.0;
const MAX_ROLLING_AVERAGE: f64 = 400.0;

const SHORT_TERM_POINTS: i32 = 6;
const LONG_TERM_POINTS: i32 = 5;

const MIN_CONCENTRATION: f64 = 6.0;
const MAX_CONCENTRATION: f64 = 180.0;

const CRITICAL_AQI: u16 = 200;
const ADVISORY_AQI: u16 = 150;

/// Relative weight of each pollutant against the city baseline AQI.
const POLLUTANT_WEIGHTS: [(Pollutant, f64); 6] = [
    (Pollutant::Pm25, 0.55),
    (Pollutant::Pm10, 0.45),
    (Pollutant::No2, 0.30),
    (Pollutant::So2, 0.15),
    (Pollutant::O3, 0.25),
    (Pollutant::Co, 0.10),
];

const CANDIDATE_SOURCES: [&str; 7] = [
    "Vehicular emissions",
    "Industrial stacks",
    "Construction dust",
    "Biomass and crop burning",
    "Coal-fired power generation",
    "Road dust resuspension",
    "Domestic cooking fuel",
];

const MAX_SOURCES: usize = 4;

pub(crate) const ANALYSIS_WEATHER_METRICS: [WeatherMetric; 5] = [
    WeatherMetric::Temperature,
    WeatherMetric::Humidity,
    WeatherMetric::WindSpeed,
    WeatherMetric::Precipitation,
    WeatherMetric::SurfacePressure,
];

pub(crate) fn facet_seed(city_id: &str, window: Window, facet: &str) -> String {
    format!("{}-{}-{}", city_id, window.key(), facet)
}

pub(crate) fn clamp_aqi(value: f64) -> u16 {
    value.round().clamp(MIN_AQI, MAX_AQI) as u16
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Last whole hour at or before `now`; trend timestamps are laid out backwards from it.
fn anchor_time(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(Duration::hours(1)).unwrap_or(now)
}

/// Builds the full analytics snapshot for a city, resolving unknown ids to the default city.
pub fn build_city_analysis(
    catalog: &CityCatalog,
    city_id: &str,
    window: Window,
    now: DateTime<Utc>,
) -> AnalysisSnapshot {
    let city = catalog.resolve(city_id);
    debug!("Synthesizing {} analysis for {}", window, city.id);

    let trend_series = generate_trend_series(city, window, now);
    let forecast = generate_forecast(city, window, &trend_series);
    let pollutant_breakdown =
        pollutant_breakdown(city, &facet_seed(&city.id, window, "pollutants"));

    let latest_aqi = trend_series
        .last()
        .map(|p| p.aqi)
        .unwrap_or_else(|| clamp_aqi(city.baseline_aqi));
    let level = AqiLevel::from_aqi(latest_aqi as f64);
    let dominant = pollutant_breakdown.first().map(|s| s.pollutant);

    AnalysisSnapshot {
        city: CitySummary::from_city(city, latest_aqi, dominant),
        forecast,
        pollutant_breakdown,
        health_advisories: health_advisories(level),
        source_attribution: source_attribution(city, window),
        weather_correlation: weather_correlation(
            &facet_seed(&city.id, window, "weather"),
            &ANALYSIS_WEATHER_METRICS,
        ),
        period_comparison: period_comparison(&trend_series, window),
        exposure: exposure_metrics(city, &trend_series),
        trend_series,
        meta: AnalysisMeta {
            window,
            generated_at: now,
            level,
        },
    }
}

/// Historical series with exactly `window.point_count()` evenly spaced points.
pub fn generate_trend_series(city: &City, window: Window, now: DateTime<Utc>) -> Vec<TrendPoint> {
    let mut rng = SeededGenerator::new(&facet_seed(&city.id, window, "trend"));
    let count = window.point_count();
    let step = window.step();
    let anchor = anchor_time(now);
    let baseline = city.baseline_aqi;

    (0..count)
        .map(|i| {
            let seasonal = 18.0 * (TAU * i as f64 / count as f64).sin();
            let aqi = clamp_aqi(baseline + seasonal + rng.spread(20.0));
            let rolling = ((aqi as f64 + baseline) / 2.0 + rng.spread(6.0))
                .clamp(MIN_AQI, MAX_ROLLING_AVERAGE);
            TrendPoint {
                timestamp: anchor - step * (count - 1 - i) as i32,
                aqi,
                rolling_average: round_to(rolling, 1),
            }
        })
        .collect()
}

/// Short-term (hourly random walk) and long-term (daily, cosine seasonal) projections
/// starting from the latest trend value.
pub fn generate_forecast(city: &City, window: Window, trend: &[TrendPoint]) -> Forecast {
    let mut rng = SeededGenerator::new(&facet_seed(&city.id, window, "forecast"));
    let (start, latest) = match trend.last() {
        Some(p) => (p.timestamp, p.aqi as f64),
        None => (Utc::now(), city.baseline_aqi),
    };

    let mut level = latest;
    let short_term = (1..=SHORT_TERM_POINTS)
        .map(|k| {
            level = (level + rng.spread(12.0)).clamp(MIN_AQI, MAX_AQI);
            ForecastPoint {
                timestamp: start + Duration::hours(1) * k,
                projected_aqi: clamp_aqi(level),
            }
        })
        .collect();

    let long_term = (1..=LONG_TERM_POINTS)
        .map(|d| {
            let seasonal = 15.0 * (TAU * d as f64 / LONG_TERM_POINTS as f64).cos();
            ForecastPoint {
                timestamp: start + Duration::days(1) * d,
                projected_aqi: clamp_aqi(latest + seasonal + rng.spread(25.0)),
            }
        })
        .collect();

    Forecast {
        short_term,
        long_term,
    }
}

/// Synthetic concentrations for the six pollutants, sorted descending and tiered.
pub fn pollutant_breakdown(city: &City, seed: &str) -> Vec<PollutantShare> {
    let mut rng = SeededGenerator::new(seed);
    let mut shares: Vec<PollutantShare> = POLLUTANT_WEIGHTS
        .iter()
        .map(|&(pollutant, weight)| {
            let boost = if pollutant == city.dominant_pollutant {
                1.25
            } else {
                1.0
            };
            let raw = city.baseline_aqi * weight * boost * (0.75 + rng.next_f64() * 0.5);
            PollutantShare {
                pollutant,
                value: round_to(raw.clamp(MIN_CONCENTRATION, MAX_CONCENTRATION), 1),
                unit: pollutant.unit().to_string(),
                tier: PollutantTier::Minor,
            }
        })
        .collect();

    shares.sort_by(|a, b| b.value.total_cmp(&a.value));
    for (rank, share) in shares.iter_mut().enumerate() {
        share.tier = match rank {
            0 => PollutantTier::Primary,
            1 => PollutantTier::Secondary,
            _ => PollutantTier::Minor,
        };
    }
    shares
}

fn advisory(
    severity: AdvisorySeverity,
    headline: &str,
    description: &str,
    actions: &[&str],
) -> HealthAdvisory {
    HealthAdvisory {
        severity,
        headline: headline.to_string(),
        description: description.to_string(),
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

/// Fixed advisory templates for an AQI band.
pub fn health_advisories(level: AqiLevel) -> Vec<HealthAdvisory> {
    match level {
        AqiLevel::Good => vec![advisory(
            AdvisorySeverity::Info,
            "Air quality is satisfactory",
            "Pollution poses little or no risk to the general public.",
            &["Enjoy outdoor activities", "Ventilate indoor spaces"],
        )],
        AqiLevel::Moderate => vec![advisory(
            AdvisorySeverity::Caution,
            "Sensitive individuals should take care",
            "Unusually sensitive people may experience minor respiratory symptoms.",
            &[
                "Limit prolonged outdoor exertion if symptomatic",
                "Keep reliever medication at hand",
            ],
        )],
        AqiLevel::Unhealthy => vec![
            advisory(
                AdvisorySeverity::Warning,
                "Reduce outdoor exertion",
                "Everyone may begin to experience health effects; sensitive groups more seriously.",
                &[
                    "Reschedule strenuous outdoor activity",
                    "Wear an N95 mask outdoors",
                    "Run air purifiers indoors",
                ],
            ),
            advisory(
                AdvisorySeverity::Caution,
                "Protect children and the elderly",
                "Schools and care homes should move activities indoors.",
                &["Keep windows closed during peak traffic hours"],
            ),
        ],
        AqiLevel::VeryUnhealthy => vec![
            advisory(
                AdvisorySeverity::Critical,
                "Health alert",
                "The risk of health effects is increased for everyone.",
                &[
                    "Avoid all outdoor physical activity",
                    "Wear an N95 mask if going outside is unavoidable",
                    "Seal windows and doors",
                ],
            ),
            advisory(
                AdvisorySeverity::Warning,
                "Restrict emission sources",
                "Local authorities should curb construction and open burning.",
                &["Report open burning to the incident desk"],
            ),
        ],
        AqiLevel::Hazardous => vec![
            advisory(
                AdvisorySeverity::Critical,
                "Health emergency",
                "Everyone is likely to be affected by serious health effects.",
                &[
                    "Stay indoors with air purification",
                    "Suspend outdoor work and school sessions",
                    "Seek medical help for breathing difficulty",
                ],
            ),
            advisory(
                AdvisorySeverity::Critical,
                "Emergency response measures",
                "Graded response actions for severe pollution episodes apply.",
                &[
                    "Halt non-essential industrial activity",
                    "Restrict heavy vehicle entry",
                ],
            ),
        ],
    }
}

/// Top contributing sources with seeded confidence in `[0.4, 0.9]`.
pub fn source_attribution(city: &City, window: Window) -> Vec<SourceAttribution> {
    let mut rng = SeededGenerator::new(&facet_seed(&city.id, window, "sources"));
    let mut sources: Vec<SourceAttribution> = CANDIDATE_SOURCES
        .iter()
        .map(|source| SourceAttribution {
            source: source.to_string(),
            confidence: round_to(rng.range(0.4, 0.9), 2),
        })
        .collect();
    sources.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    sources.truncate(MAX_SOURCES);
    sources
}

/// Seeded correlation coefficients in `[-0.8, 0.8]` for each metric.
pub fn weather_correlation(seed: &str, metrics: &[WeatherMetric]) -> Vec<WeatherCorrelation> {
    let mut rng = SeededGenerator::new(seed);
    metrics
        .iter()
        .map(|&metric| WeatherCorrelation {
            metric,
            coefficient: round_to(rng.spread(0.8), 2),
        })
        .collect()
}

/// Size of the trailing "current" slice: 6 points for 24h, about a quarter otherwise.
fn current_slice_len(len: usize, window: Window) -> usize {
    let size = match window {
        Window::Hours24 => 6,
        _ => ((len as f64) / 4.0).round() as usize,
    };
    size.clamp(1, len.max(1))
}

/// Compares the trailing slice of the trend with the slice immediately before it.
pub fn period_comparison(trend: &[TrendPoint], window: Window) -> PeriodComparison {
    let len = trend.len();
    let current_len = current_slice_len(len, window).min(len);
    let previous_len = current_len.min(len - current_len);

    let current = &trend[len - current_len..];
    let previous = &trend[len - current_len - previous_len..len - current_len];

    let current_average = mean(current.iter().map(|p| p.aqi as f64)).unwrap_or(0.0);
    let previous_average =
        mean(previous.iter().map(|p| p.aqi as f64)).unwrap_or(current_average);
    let delta = round_to(current_average - previous_average, 1);

    let direction = if delta > 0.0 {
        TrendDirection::Rising
    } else if delta < 0.0 {
        TrendDirection::Improving
    } else {
        TrendDirection::Flat
    };

    PeriodComparison {
        current_average: round_to(current_average, 1),
        previous_average: round_to(previous_average, 1),
        delta,
        direction,
        critical_points: current.iter().filter(|p| p.aqi >= CRITICAL_AQI).count(),
        advisory_points: current.iter().filter(|p| p.aqi >= ADVISORY_AQI).count(),
    }
}

/// Population exposure estimate over the trend series.
///
/// Daily-granularity windows (fewer than 24 points) scale the hit count by 4 to
/// approximate hour-equivalents.
pub fn exposure_metrics(city: &City, trend: &[TrendPoint]) -> ExposureMetrics {
    let elevated = trend.iter().filter(|p| p.aqi >= ADVISORY_AQI).count();
    let scale = if trend.len() < 24 { 4 } else { 1 };
    ExposureMetrics {
        estimated_population: (150_000.0 + city.population as f64 * 0.15).round() as u64,
        aqi_load_index: round_to(mean(trend.iter().map(|p| p.aqi as f64)).unwrap_or(0.0), 1),
        exposure_hours: elevated * scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, 14, 37, 12).unwrap()
    }

    fn point(aqi: u16, hours: i64) -> TrendPoint {
        TrendPoint {
            timestamp: fixed_now() + Duration::hours(hours),
            aqi,
            rolling_average: aqi as f64,
        }
    }

    #[rstest]
    #[case(Window::Hours24, 24)]
    #[case(Window::Days7, 7)]
    #[case(Window::Days30, 30)]
    fn test_trend_cardinality_and_spacing(#[case] window: Window, #[case] expected: usize) {
        let catalog = CityCatalog::load();
        let series = generate_trend_series(catalog.resolve("delhi"), window, fixed_now());
        assert_eq!(series.len(), expected);
        for pair in series.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
            assert_eq!(pair[1].timestamp - pair[0].timestamp, window.step());
        }
        assert!(series.iter().all(|p| (20..=420).contains(&p.aqi)));
        assert!(series
            .iter()
            .all(|p| (20.0..=400.0).contains(&p.rolling_average)));
    }

    #[test]
    fn test_trend_ends_at_anchor_hour() {
        let catalog = CityCatalog::load();
        let series = generate_trend_series(catalog.resolve("mumbai"), Window::Hours24, fixed_now());
        let last = series.last().unwrap();
        assert_eq!(last.timestamp, Utc.with_ymd_and_hms(2024, 11, 5, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_snapshot_is_deterministic_per_city_and_window() {
        let catalog = CityCatalog::load();
        let a = build_city_analysis(&catalog, "kolkata", Window::Days7, fixed_now());
        let b = build_city_analysis(&catalog, "kolkata", Window::Days7, fixed_now());
        assert_eq!(a, b);

        let other = build_city_analysis(&catalog, "kolkata", Window::Days30, fixed_now());
        assert_ne!(a.pollutant_breakdown, other.pollutant_breakdown);
    }

    #[test]
    fn test_unknown_city_uses_default() {
        let catalog = CityCatalog::load();
        let snapshot = build_city_analysis(&catalog, "gotham", Window::Hours24, fixed_now());
        assert_eq!(snapshot.city.id, "delhi");
    }

    #[test]
    fn test_forecast_shape() {
        let catalog = CityCatalog::load();
        let snapshot = build_city_analysis(&catalog, "pune", Window::Hours24, fixed_now());
        let last = snapshot.trend_series.last().unwrap().timestamp;
        assert_eq!(snapshot.forecast.short_term.len(), 6);
        assert_eq!(snapshot.forecast.long_term.len(), 5);
        assert_eq!(snapshot.forecast.short_term[0].timestamp, last + Duration::hours(1));
        assert_eq!(snapshot.forecast.long_term[4].timestamp, last + Duration::days(5));
        assert!(snapshot
            .forecast
            .short_term
            .iter()
            .chain(snapshot.forecast.long_term.iter())
            .all(|p| (20..=420).contains(&p.projected_aqi)));
    }

    #[test]
    fn test_pollutant_breakdown_tiers() {
        let catalog = CityCatalog::load();
        let breakdown = pollutant_breakdown(catalog.resolve("delhi"), "delhi-24h-pollutants");
        assert_eq!(breakdown.len(), 6);
        assert_eq!(breakdown[0].tier, PollutantTier::Primary);
        assert_eq!(breakdown[1].tier, PollutantTier::Secondary);
        assert!(breakdown[2..].iter().all(|s| s.tier == PollutantTier::Minor));
        assert!(breakdown.windows(2).all(|w| w[0].value >= w[1].value));
        assert!(breakdown.iter().all(|s| (6.0..=180.0).contains(&s.value)));
    }

    #[test]
    fn test_health_advisories_have_no_randomness() {
        assert_eq!(
            health_advisories(AqiLevel::Hazardous),
            health_advisories(AqiLevel::Hazardous)
        );
        assert_eq!(health_advisories(AqiLevel::Good).len(), 1);
        assert!(health_advisories(AqiLevel::VeryUnhealthy)
            .iter()
            .any(|a| a.severity == AdvisorySeverity::Critical));
    }

    #[test]
    fn test_source_attribution_keeps_top_four() {
        let catalog = CityCatalog::load();
        let sources = source_attribution(catalog.resolve("patna"), Window::Days30);
        assert_eq!(sources.len(), 4);
        assert!(sources.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        assert!(sources.iter().all(|s| (0.4..=0.9).contains(&s.confidence)));
    }

    #[test]
    fn test_weather_correlation_bounds() {
        let correlations = weather_correlation("x-24h-weather", &ANALYSIS_WEATHER_METRICS);
        assert_eq!(correlations.len(), 5);
        assert!(correlations
            .iter()
            .all(|c| (-0.8..=0.8).contains(&c.coefficient)));
    }

    #[test]
    fn test_period_comparison_24h_slices() {
        // 18 points at 100 followed by 6 points at 210.
        let mut trend: Vec<TrendPoint> = (0..18).map(|h| point(100, h)).collect();
        trend.extend((18..24).map(|h| point(210, h)));

        let cmp = period_comparison(&trend, Window::Hours24);
        assert_eq!(cmp.current_average, 210.0);
        assert_eq!(cmp.previous_average, 100.0);
        assert_eq!(cmp.delta, 110.0);
        assert_eq!(cmp.direction, TrendDirection::Rising);
        assert_eq!(cmp.critical_points, 6);
        assert_eq!(cmp.advisory_points, 6);
    }

    #[test]
    fn test_period_comparison_daily_slices() {
        // 7d: current slice is round(7 / 4) = 2 points, previous the 2 before it.
        let trend: Vec<TrendPoint> = [180, 180, 180, 160, 160, 120, 152]
            .iter()
            .enumerate()
            .map(|(i, &aqi)| point(aqi, i as i64 * 24))
            .collect();

        let cmp = period_comparison(&trend, Window::Days7);
        assert_eq!(cmp.current_average, 136.0);
        assert_eq!(cmp.previous_average, 160.0);
        assert_eq!(cmp.direction, TrendDirection::Improving);
        assert_eq!(cmp.advisory_points, 1);
        assert_eq!(cmp.critical_points, 0);
    }

    #[test]
    fn test_period_comparison_flat() {
        let trend: Vec<TrendPoint> = (0..30).map(|d| point(90, d * 24)).collect();
        let cmp = period_comparison(&trend, Window::Days30);
        assert_eq!(cmp.direction, TrendDirection::Flat);
        assert_eq!(cmp.delta, 0.0);
    }

    #[test]
    fn test_exposure_metrics_scaling() {
        let catalog = CityCatalog::load();
        let city = catalog.resolve("delhi");
        let daily: Vec<TrendPoint> = [150, 90, 220, 80, 100, 100, 100]
            .iter()
            .enumerate()
            .map(|(i, &aqi)| point(aqi, i as i64 * 24))
            .collect();
        let exposure = exposure_metrics(city, &daily);
        assert_eq!(exposure.exposure_hours, 8);
        assert_eq!(exposure.aqi_load_index, 120.0);
        assert_eq!(
            exposure.estimated_population,
            (150_000.0 + city.population as f64 * 0.15).round() as u64
        );

        let hourly: Vec<TrendPoint> = (0..24).map(|h| point(if h < 3 { 160 } else { 60 }, h)).collect();
        assert_eq!(exposure_metrics(city, &hourly).exposure_hours, 3);
    }
}
