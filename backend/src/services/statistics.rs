//! Statistics over the recent observation window
//!
//! The window is ordered newest first. All functions here are pure.

use shared::{InsightsSummary, Observation, TemperatureTrend};

/// Size of each sub-window compared by the trend detector
pub const TREND_WINDOW: usize = 24;

/// Raw statistics for a non-empty window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStatistics {
    pub total_records: usize,
    pub average_temperature: f64,
    pub average_humidity: f64,
    pub average_wind_speed: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub temperature_trend: TemperatureTrend,
    /// Unrounded, already clamped to [0, 100]
    pub comfort_score: f64,
}

impl WindowStatistics {
    /// Rounded figures as reported to clients
    ///
    /// Averages are kept inside the observed extrema after rounding.
    pub fn to_summary(&self) -> InsightsSummary {
        InsightsSummary {
            total_records: self.total_records,
            average_temperature: round_half_up(self.average_temperature, 1)
                .clamp(self.min_temperature, self.max_temperature),
            average_humidity: round_half_up(self.average_humidity, 1),
            max_temperature: self.max_temperature,
            min_temperature: self.min_temperature,
            temperature_trend: self.temperature_trend,
            comfort_score: round_half_up(self.comfort_score, 0) as u8,
        }
    }
}

/// Compute window statistics, `None` for an empty window
pub fn compute_statistics(window: &[Observation]) -> Option<WindowStatistics> {
    if window.is_empty() {
        return None;
    }

    let average_temperature = mean(window.iter().map(|o| o.current.temperature));
    let average_humidity = mean(window.iter().map(|o| o.current.humidity));
    let average_wind_speed = mean(window.iter().map(|o| o.current.wind_speed));

    let (min_temperature, max_temperature) = window.iter().map(|o| o.current.temperature).fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), t| (lo.min(t), hi.max(t)),
    );

    Some(WindowStatistics {
        total_records: window.len(),
        average_temperature,
        average_humidity,
        average_wind_speed,
        max_temperature,
        min_temperature,
        temperature_trend: detect_temperature_trend(window),
        comfort_score: comfort_score(average_temperature, average_humidity, average_wind_speed),
    })
}

/// Compare the newest 24 observations against the 24 before them
pub fn detect_temperature_trend(window: &[Observation]) -> TemperatureTrend {
    if window.len() < TREND_WINDOW * 2 {
        return TemperatureTrend::InsufficientData;
    }

    let recent = mean(window[..TREND_WINDOW].iter().map(|o| o.current.temperature));
    let previous = mean(
        window[TREND_WINDOW..TREND_WINDOW * 2]
            .iter()
            .map(|o| o.current.temperature),
    );
    let diff = recent - previous;

    if diff > 3.0 {
        TemperatureTrend::RisingFast
    } else if diff > 1.0 {
        TemperatureTrend::Rising
    } else if diff < -3.0 {
        TemperatureTrend::FallingFast
    } else if diff < -1.0 {
        TemperatureTrend::Falling
    } else {
        TemperatureTrend::Stable
    }
}

/// Heuristic 0-100 rating of how pleasant the conditions are
pub fn comfort_score(average_temperature: f64, average_humidity: f64, average_wind_speed: f64) -> f64 {
    let mut score = 100.0;

    if !(18.0..=26.0).contains(&average_temperature) {
        score -= ((average_temperature - 22.0).abs() * 3.0).min(40.0);
    }

    if !(30.0..=70.0).contains(&average_humidity) {
        score -= ((average_humidity - 50.0).abs() * 1.5).min(30.0);
    }

    if average_wind_speed > 20.0 || average_wind_speed < 2.0 {
        score -= 15.0;
    }

    score.clamp(0.0, 100.0)
}

/// Arithmetic mean; callers guarantee a non-empty iterator
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Round to `decimals` places with halves going up
pub fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}
