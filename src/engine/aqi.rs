//! Breakpoint-based AQI calculation.
//!
//! PM2.5 and PM10 use the published EPA piecewise-linear breakpoint tables. The
//! remaining gases are mapped with a fixed linear factor per pollutant, since no
//! complete table is carried for them.

use crate::models::{Pollutant, PollutantReading};
use tracing::debug;

/// One row of a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub concentration_low: f64,
    pub concentration_high: f64,
    pub index_low: f64,
    pub index_high: f64,
}

const fn bp(c_lo: f64, c_hi: f64, i_lo: f64, i_hi: f64) -> Breakpoint {
    Breakpoint {
        concentration_low: c_lo,
        concentration_high: c_hi,
        index_low: i_lo,
        index_high: i_hi,
    }
}

/// PM2.5 breakpoints (µg/m³, 24-hour average).
pub const PM25_BREAKPOINTS: [Breakpoint; 7] = [
    bp(0.0, 12.0, 0.0, 50.0),
    bp(12.1, 35.4, 51.0, 100.0),
    bp(35.5, 55.4, 101.0, 150.0),
    bp(55.5, 150.4, 151.0, 200.0),
    bp(150.5, 250.4, 201.0, 300.0),
    bp(250.5, 350.4, 301.0, 400.0),
    bp(350.5, 500.4, 401.0, 500.0),
];

/// PM10 breakpoints (µg/m³, 24-hour average).
pub const PM10_BREAKPOINTS: [Breakpoint; 7] = [
    bp(0.0, 54.0, 0.0, 50.0),
    bp(55.0, 154.0, 51.0, 100.0),
    bp(155.0, 254.0, 101.0, 150.0),
    bp(255.0, 354.0, 151.0, 200.0),
    bp(355.0, 424.0, 201.0, 300.0),
    bp(425.0, 504.0, 301.0, 400.0),
    bp(505.0, 604.0, 401.0, 500.0),
];

/// Upper bound of the linear-factor pollutants.
const LINEAR_INDEX_CAP: f64 = 400.0;

/// Result of combining several sub-indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AqiSummary {
    pub aqi: u16,
    pub dominant_pollutant: Option<Pollutant>,
}

/// Returns the breakpoint table for pollutants that have one.
pub fn breakpoint_table(pollutant: Pollutant) -> Option<&'static [Breakpoint]> {
    match pollutant {
        Pollutant::Pm25 => Some(&PM25_BREAKPOINTS),
        Pollutant::Pm10 => Some(&PM10_BREAKPOINTS),
        _ => None,
    }
}

/// Linear scaling factor for pollutants without a breakpoint table.
fn linear_factor(pollutant: Pollutant) -> f64 {
    match pollutant {
        Pollutant::No2 => 1.0,
        Pollutant::So2 => 1.2,
        Pollutant::O3 => 0.8,
        Pollutant::Co => 0.1,
        // Tabled pollutants never reach this path.
        Pollutant::Pm25 | Pollutant::Pm10 => 1.0,
    }
}

/// Interpolates a concentration over a breakpoint table.
///
/// Concentrations above the last range are clamped to its upper bound. A value
/// falling in the gap between two published ranges is evaluated against the
/// next range up.
pub fn interpolate(table: &[Breakpoint], concentration: f64) -> u16 {
    let Some(last) = table.last() else {
        return 0;
    };
    let c = concentration.min(last.concentration_high);
    let range = table
        .iter()
        .find(|b| c <= b.concentration_high)
        .unwrap_or(last);

    let slope =
        (range.index_high - range.index_low) / (range.concentration_high - range.concentration_low);
    let index = (slope * (c - range.concentration_low) + range.index_low).round();
    index.clamp(0.0, 500.0) as u16
}

/// Sub-index for a single pollutant concentration.
///
/// Returns `None` for negative, NaN or infinite concentrations so that callers
/// can drop malformed readings instead of failing.
pub fn sub_index(pollutant: Pollutant, concentration: f64) -> Option<u16> {
    if !concentration.is_finite() || concentration < 0.0 {
        debug!(
            "Ignoring malformed {} concentration: {}",
            pollutant, concentration
        );
        return None;
    }

    let index = match breakpoint_table(pollutant) {
        Some(table) => interpolate(table, concentration),
        None => (concentration * linear_factor(pollutant))
            .round()
            .clamp(0.0, LINEAR_INDEX_CAP) as u16,
    };
    Some(index)
}

/// Overall AQI across a set of `(pollutant, concentration)` pairs.
///
/// The maximum sub-index wins; on ties the first pollutant in iteration order is kept.
/// With no valid input the AQI is `0` and there is no dominant pollutant.
pub fn summarize<I>(readings: I) -> AqiSummary
where
    I: IntoIterator<Item = (Pollutant, Option<f64>)>,
{
    let mut best: Option<(Pollutant, u16)> = None;

    for (pollutant, value) in readings {
        let Some(index) = value.and_then(|v| sub_index(pollutant, v)) else {
            continue;
        };
        match best {
            Some((_, current)) if index <= current => {},
            _ => best = Some((pollutant, index)),
        }
    }

    match best {
        Some((pollutant, aqi)) => AqiSummary {
            aqi,
            dominant_pollutant: Some(pollutant),
        },
        None => AqiSummary {
            aqi: 0,
            dominant_pollutant: None,
        },
    }
}

/// Convenience wrapper over [`summarize`] for reading structs.
pub fn summarize_readings(readings: &[PollutantReading]) -> AqiSummary {
    summarize(readings.iter().map(|r| (r.pollutant, r.value)))
}
