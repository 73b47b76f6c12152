//! Pollutant keys, readings, analysis windows and AQI severity levels.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// The fixed set of tracked pollutants.
///
/// The declaration order doubles as the evaluation order for dominant-pollutant
/// tie-breaking, so it must not be rearranged casually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "pm25", alias = "PM2.5")]
    Pm25,
    #[serde(rename = "pm10", alias = "PM10")]
    Pm10,
    #[serde(rename = "no2", alias = "NO2")]
    No2,
    #[serde(rename = "so2", alias = "SO2")]
    So2,
    #[serde(rename = "o3", alias = "O3")]
    O3,
    #[serde(rename = "co", alias = "CO")]
    Co,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::O3,
        Pollutant::Co,
    ];

    /// Short machine key, matching the serialized form.
    pub fn key(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm25",
            Pollutant::Pm10 => "pm10",
            Pollutant::No2 => "no2",
            Pollutant::So2 => "so2",
            Pollutant::O3 => "o3",
            Pollutant::Co => "co",
        }
    }

    /// Human readable label (e.g. `PM2.5`).
    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::No2 => "NO2",
            Pollutant::So2 => "SO2",
            Pollutant::O3 => "O3",
            Pollutant::Co => "CO",
        }
    }

    /// Concentration unit. Everything is reported in µg/m³.
    pub fn unit(&self) -> &'static str {
        "µg/m³"
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Pollutant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pm25" | "pm2.5" | "pm2_5" => Ok(Pollutant::Pm25),
            "pm10" => Ok(Pollutant::Pm10),
            "no2" => Ok(Pollutant::No2),
            "so2" => Ok(Pollutant::So2),
            "o3" => Ok(Pollutant::O3),
            "co" => Ok(Pollutant::Co),
            other => Err(AppError::Cli(format!("Unknown pollutant: {}", other))),
        }
    }
}

/// A single pollutant observation, either measured remotely or synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollutantReading {
    pub pollutant: Pollutant,
    /// `None` when the upstream value was missing or not numeric.
    pub value: Option<f64>,
    pub unit: String,
    pub observed_at: DateTime<Utc>,
}

impl PollutantReading {
    pub fn new(pollutant: Pollutant, value: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            pollutant,
            value: Some(value),
            unit: pollutant.unit().to_string(),
            observed_at,
        }
    }
}

/// Analysis time range. Each window has a fixed point count and step size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "24h")]
    Hours24,
    #[serde(rename = "7d")]
    Days7,
    #[serde(rename = "30d")]
    Days30,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::Hours24, Window::Days7, Window::Days30];

    pub fn key(&self) -> &'static str {
        match self {
            Window::Hours24 => "24h",
            Window::Days7 => "7d",
            Window::Days30 => "30d",
        }
    }

    /// Number of trend points produced for this window.
    pub fn point_count(&self) -> usize {
        match self {
            Window::Hours24 => 24,
            Window::Days7 => 7,
            Window::Days30 => 30,
        }
    }

    /// Spacing between consecutive trend points.
    pub fn step(&self) -> Duration {
        match self {
            Window::Hours24 => Duration::hours(1),
            Window::Days7 | Window::Days30 => Duration::hours(24),
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::Hours24
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Window {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "24h" => Ok(Window::Hours24),
            "7d" => Ok(Window::Days7),
            "30d" => Ok(Window::Days30),
            other => Err(AppError::Cli(format!(
                "Invalid window '{}'. Must be one of: 24h, 7d, 30d",
                other
            ))),
        }
    }
}

/// AQI severity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AqiLevel {
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiLevel {
    pub fn from_aqi(aqi: f64) -> Self {
        match aqi {
            a if a <= 50.0 => AqiLevel::Good,
            a if a <= 100.0 => AqiLevel::Moderate,
            a if a <= 200.0 => AqiLevel::Unhealthy,
            a if a <= 300.0 => AqiLevel::VeryUnhealthy,
            _ => AqiLevel::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiLevel::Good => "Good",
            AqiLevel::Moderate => "Moderate",
            AqiLevel::Unhealthy => "Unhealthy",
            AqiLevel::VeryUnhealthy => "Very Unhealthy",
            AqiLevel::Hazardous => "Hazardous",
        }
    }
}

impl fmt::Display for AqiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
