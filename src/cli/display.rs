//! Terminal rendering of query results.

use colored::*;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::api::{DataSource, QueryResult};
use crate::engine::aqi::AqiSummary;
use crate::error::Result;
use crate::models::{
    AnalysisSnapshot, AqiLevel, City, CityForecastSummary, CitySnapshot, Forecast,
    MultiCityOverview, TrendDirection, TrendPoint,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Spinner shown while a query is in flight.
pub fn spinner(message: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

fn level_color(level: AqiLevel) -> Color {
    match level {
        AqiLevel::Good => Color::Green,
        AqiLevel::Moderate => Color::Yellow,
        AqiLevel::Unhealthy => Color::DarkYellow,
        AqiLevel::VeryUnhealthy => Color::Red,
        AqiLevel::Hazardous => Color::Magenta,
    }
}

fn aqi_cell(aqi: u16) -> Cell {
    Cell::new(aqi).fg(level_color(AqiLevel::from_aqi(aqi as f64)))
}

fn colored_level(level: AqiLevel) -> ColoredString {
    match level {
        AqiLevel::Good => level.label().green(),
        AqiLevel::Moderate => level.label().yellow(),
        AqiLevel::Unhealthy => level.label().bright_red(),
        AqiLevel::VeryUnhealthy => level.label().red().bold(),
        AqiLevel::Hazardous => level.label().magenta().bold(),
    }
}

/// Prints the source line, plus a soft warning when local data was substituted.
pub fn print_source<T>(result: &QueryResult<T>) {
    match result.source {
        DataSource::Remote => println!("{} {}", "Source:".dimmed(), result.source.label().green()),
        DataSource::Fallback => {
            println!("{} {}", "Source:".dimmed(), result.source.label().yellow());
            if let Some(e) = &result.error {
                println!(
                    "{} {}",
                    "Warning: remote data unavailable, showing synthesized values.".yellow(),
                    e.to_string().dimmed()
                );
            }
        },
    }
}

fn print_trend(trend: &[TrendPoint]) {
    let mut t = table(&["Timestamp", "AQI", "Rolling avg"]);
    for point in trend {
        t.add_row(vec![
            Cell::new(point.timestamp.format(TIMESTAMP_FORMAT)),
            aqi_cell(point.aqi),
            Cell::new(format!("{:.1}", point.rolling_average)),
        ]);
    }
    println!("{}", "Trend".bold());
    println!("{t}");
}

fn print_forecast_tables(forecast: &Forecast) {
    let mut t = table(&["Horizon", "Timestamp", "Projected AQI"]);
    for (horizon, points) in [
        ("short", &forecast.short_term),
        ("long", &forecast.long_term),
    ] {
        for point in points {
            t.add_row(vec![
                Cell::new(horizon),
                Cell::new(point.timestamp.format(TIMESTAMP_FORMAT)),
                aqi_cell(point.projected_aqi),
            ]);
        }
    }
    println!("{}", "Forecast".bold());
    println!("{t}");
}

pub fn print_analysis(result: &QueryResult<AnalysisSnapshot>) {
    let snapshot = &result.data;
    let city = &snapshot.city;
    println!(
        "{} ({}, {}) | window {} | AQI {} {}",
        city.name.cyan().bold(),
        city.region,
        city.country,
        snapshot.meta.window,
        city.current_aqi.to_string().bold(),
        colored_level(snapshot.meta.level)
    );
    if let Some(p) = city.dominant_pollutant {
        println!("Dominant pollutant: {}", p.label());
    }
    print_source(result);

    print_trend(&snapshot.trend_series);
    print_forecast_tables(&snapshot.forecast);

    let mut pollutants = table(&["Pollutant", "Value", "Tier"]);
    for share in &snapshot.pollutant_breakdown {
        pollutants.add_row(vec![
            Cell::new(share.pollutant.label()),
            Cell::new(format!("{:.1} {}", share.value, share.unit)),
            Cell::new(format!("{:?}", share.tier).to_lowercase()),
        ]);
    }
    println!("{}", "Pollutant breakdown".bold());
    println!("{pollutants}");

    let mut drivers = table(&["Source", "Confidence"]);
    for source in &snapshot.source_attribution {
        drivers.add_row(vec![
            Cell::new(&source.source),
            Cell::new(format!("{:.0}%", source.confidence * 100.0)),
        ]);
    }
    let mut weather = table(&["Metric", "Correlation"]);
    for c in &snapshot.weather_correlation {
        weather.add_row(vec![
            Cell::new(c.metric.label()),
            Cell::new(format!("{:+.2}", c.coefficient)),
        ]);
    }
    println!("{}", "Likely sources".bold());
    println!("{drivers}");
    println!("{}", "Weather correlation".bold());
    println!("{weather}");

    let cmp = &snapshot.period_comparison;
    let direction = match cmp.direction {
        TrendDirection::Rising => "rising".red(),
        TrendDirection::Improving => "improving".green(),
        TrendDirection::Flat => "flat".normal(),
    };
    println!(
        "Period: {:.1} vs {:.1} ({:+.1}, {}), {} critical / {} advisory points",
        cmp.current_average,
        cmp.previous_average,
        cmp.delta,
        direction,
        cmp.critical_points,
        cmp.advisory_points
    );
    println!(
        "Exposure: {} people, load index {:.2}, {} hours above threshold",
        snapshot.exposure.estimated_population,
        snapshot.exposure.aqi_load_index,
        snapshot.exposure.exposure_hours
    );

    println!("{}", "Health advisories".bold());
    for advisory in &snapshot.health_advisories {
        println!(
            "  [{}] {}: {}",
            format!("{:?}", advisory.severity).to_uppercase().yellow(),
            advisory.headline.bold(),
            advisory.description
        );
        for action in &advisory.actions {
            println!("      - {}", action);
        }
    }
}

pub fn print_forecast(result: &QueryResult<CityForecastSummary>) {
    let summary = &result.data;
    println!(
        "{} | window {} | AQI {} {}",
        summary.city.name.cyan().bold(),
        summary.meta.window,
        summary.city.current_aqi.to_string().bold(),
        colored_level(summary.meta.level)
    );
    print_source(result);
    print_trend(&summary.trend_series);
    print_forecast_tables(&summary.forecast);
}

pub fn print_overview(result: &QueryResult<MultiCityOverview>) {
    let overview = &result.data;
    println!(
        "{} | {} cities | window {}",
        "Multi-city overview".cyan().bold(),
        overview.meta.cohort_size,
        overview.meta.window
    );
    print_source(result);

    let mut matrix = table(&["City", "Region", "AQI", "Change", "Level", "Dominant"]);
    for entry in &overview.matrix {
        matrix.add_row(vec![
            Cell::new(&entry.city_name),
            Cell::new(&entry.region),
            aqi_cell(entry.aqi),
            Cell::new(format!("{:+.1}", entry.change)),
            Cell::new(entry.level.label()).fg(level_color(entry.level)),
            Cell::new(entry.dominant_pollutant.map(|p| p.label()).unwrap_or("-")),
        ]);
    }
    println!("{matrix}");

    let mut boards = table(&["Board", "City", "Delta", "AQI"]);
    for (board, entries) in [
        ("improving", &overview.leaderboards.improving),
        ("deteriorating", &overview.leaderboards.deteriorating),
    ] {
        for entry in entries {
            boards.add_row(vec![
                Cell::new(board),
                Cell::new(&entry.city_name),
                Cell::new(format!("{:+.1}", entry.delta)),
                aqi_cell(entry.current_aqi),
            ]);
        }
    }
    println!("{}", "Leaderboards".bold());
    println!("{boards}");

    let mut hourly = table(&["Hour", "Avg AQI"]);
    for point in &overview.temporal_patterns.hourly {
        hourly.add_row(vec![Cell::new(&point.label), aqi_cell(point.average_aqi)]);
    }
    let mut weekly = table(&["Day", "Avg AQI"]);
    for point in &overview.temporal_patterns.weekly {
        weekly.add_row(vec![Cell::new(&point.label), aqi_cell(point.average_aqi)]);
    }
    println!("{}", "Temporal patterns".bold());
    println!("{hourly}");
    println!("{weekly}");

    let impact = &overview.cumulative_impact;
    println!(
        "Cumulative: avg AQI {}, {} hazardous hours, {} alerts, {} people exposed",
        impact.average_aqi, impact.hazardous_hours, impact.alerts_issued, impact.population_exposed
    );
}

pub fn print_live(result: &QueryResult<Vec<CitySnapshot>>) {
    println!("{}", "Live snapshots".cyan().bold());
    print_source(result);
    let mut t = table(&["City", "AQI", "Level", "Dominant", "Observed"]);
    for snapshot in &result.data {
        t.add_row(vec![
            Cell::new(&snapshot.city_name),
            aqi_cell(snapshot.aqi),
            Cell::new(snapshot.level.label()).fg(level_color(snapshot.level)),
            Cell::new(snapshot.dominant_pollutant.map(|p| p.label()).unwrap_or("-")),
            Cell::new(snapshot.observed_at.format(TIMESTAMP_FORMAT)),
        ]);
    }
    println!("{t}");
}

pub fn print_aqi(summary: &AqiSummary) {
    match summary.dominant_pollutant {
        Some(pollutant) => {
            let level = AqiLevel::from_aqi(summary.aqi as f64);
            println!(
                "AQI {} ({}), dominant pollutant {}",
                summary.aqi.to_string().bold(),
                colored_level(level),
                pollutant.label()
            );
        },
        None => println!("{}", "No valid readings provided; AQI is 0.".yellow()),
    }
}

pub fn print_cities(cities: &[City]) {
    let mut t = table(&["Id", "Name", "Region", "Baseline AQI", "Dominant", "Population"]);
    for city in cities {
        t.add_row(vec![
            Cell::new(&city.id),
            Cell::new(&city.name),
            Cell::new(&city.region),
            Cell::new(format!("{:.0}", city.baseline_aqi)),
            Cell::new(city.dominant_pollutant.label()),
            Cell::new(city.population),
        ]);
    }
    println!("{t}");
}
