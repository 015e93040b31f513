//! Rule-based window classification, alerts and multi-hour patterns
//!
//! Not to be confused with [`shared::classify_observation`], which labels a
//! single reading at write time with a different rule set.

use std::fmt;

use shared::{Observation, WindowCondition};

use crate::services::statistics::mean;

/// Observations used for the precipitation part of the classification
pub const CLASSIFICATION_WINDOW: usize = 24;

/// Observations inspected by the short-range alerts
pub const ALERT_WINDOW: usize = 12;

/// Observations inspected by the pattern detector
pub const PATTERN_WINDOW: usize = 72;

/// Label the window, first matching rule wins
pub fn classify_window(
    window: &[Observation],
    average_temperature: f64,
    average_humidity: f64,
) -> WindowCondition {
    let recent = newest(window, CLASSIFICATION_WINDOW);
    let precipitation_prob = mean(recent.iter().map(Observation::max_precipitation_prob));

    if precipitation_prob > 70.0 {
        WindowCondition::Rainy
    } else if average_temperature > 35.0 {
        WindowCondition::VeryHot
    } else if average_temperature > 28.0 && average_humidity > 80.0 {
        WindowCondition::HotHumid
    } else if average_temperature > 25.0 {
        WindowCondition::Hot
    } else if average_temperature < 5.0 {
        WindowCondition::VeryCold
    } else if average_temperature < 15.0 {
        WindowCondition::Cold
    } else if average_humidity > 85.0 {
        WindowCondition::VeryHumid
    } else {
        WindowCondition::Pleasant
    }
}

/// Kinds of weather alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    ExtremeHeat,
    IntenseCold,
    VeryHighHumidity,
    VeryDry,
    HighRainProbability,
    SharpTemperatureVariation,
    PoorVentilation,
}

impl AlertKind {
    pub fn message(&self) -> &'static str {
        match self {
            AlertKind::ExtremeHeat => "🔥 Extreme heat - avoid prolonged sun exposure",
            AlertKind::IntenseCold => "🧊 Intense cold - wear appropriate clothing",
            AlertKind::VeryHighHumidity => "💧 Very high humidity - muggy conditions",
            AlertKind::VeryDry => "🏜️ Very dry air - stay well hydrated",
            AlertKind::HighRainProbability => "🌧️ High probability of rain in the coming hours",
            AlertKind::SharpTemperatureVariation => "🌡️ Sharp temperature variation",
            AlertKind::PoorVentilation => "🌫️ Poor ventilation may affect air quality",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Every alert that fires for the window; checks are independent
pub fn generate_alerts(
    window: &[Observation],
    average_temperature: f64,
    average_humidity: f64,
) -> Vec<AlertKind> {
    let mut alerts = Vec::new();
    let recent = newest(window, ALERT_WINDOW);

    if average_temperature > 35.0 {
        alerts.push(AlertKind::ExtremeHeat);
    }
    if average_temperature < 5.0 {
        alerts.push(AlertKind::IntenseCold);
    }
    if average_humidity > 85.0 {
        alerts.push(AlertKind::VeryHighHumidity);
    }
    if average_humidity < 20.0 {
        alerts.push(AlertKind::VeryDry);
    }

    if recent.iter().any(|o| o.max_precipitation_prob() > 80.0) {
        alerts.push(AlertKind::HighRainProbability);
    }

    if !recent.is_empty() {
        let (lo, hi) = recent
            .iter()
            .map(|o| o.current.temperature)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(t), hi.max(t))
            });
        if hi - lo > 10.0 {
            alerts.push(AlertKind::SharpTemperatureVariation);
        }

        let recent_wind = mean(recent.iter().map(|o| o.current.wind_speed));
        if recent_wind < 5.0 && average_humidity > 70.0 {
            alerts.push(AlertKind::PoorVentilation);
        }
    }

    alerts
}

/// Multi-hour pattern found in the last 72 observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherPattern {
    /// Share of the 72 hours with high rain probability, in percent
    Rain { percentage: u32 },
    /// Number of hour-to-hour swings above 3°C
    ThermalVolatility { changes: usize },
    /// Hours with humidity above 80%
    HighHumidity { hours: usize },
}

impl fmt::Display for WeatherPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherPattern::Rain { percentage } => write!(
                f,
                "Rain pattern: {}% of the last 72h with high rain probability",
                percentage
            ),
            WeatherPattern::ThermalVolatility { changes } => write!(
                f,
                "Thermal variation pattern: {} significant temperature changes in the last 72h",
                changes
            ),
            WeatherPattern::HighHumidity { hours } => write!(
                f,
                "High humidity pattern: {} hours with humidity above 80%",
                hours
            ),
        }
    }
}

/// Detect rain streaks, thermal swings and humidity streaks
pub fn detect_patterns(window: &[Observation]) -> Vec<WeatherPattern> {
    let mut patterns = Vec::new();
    let recent = newest(window, PATTERN_WINDOW);

    let rain_hours = recent
        .iter()
        .filter(|o| o.max_precipitation_prob() > 60.0)
        .count();
    if rain_hours >= 12 {
        // Share of the full 72h span, even when fewer observations exist
        let percentage = (rain_hours as f64 / PATTERN_WINDOW as f64 * 100.0 + 0.5).floor() as u32;
        patterns.push(WeatherPattern::Rain { percentage });
    }

    let changes = recent
        .windows(2)
        .filter(|pair| (pair[0].current.temperature - pair[1].current.temperature).abs() > 3.0)
        .count();
    if changes > 5 {
        patterns.push(WeatherPattern::ThermalVolatility { changes });
    }

    let humid_hours = recent.iter().filter(|o| o.current.humidity > 80.0).count();
    if humid_hours > 24 {
        patterns.push(WeatherPattern::HighHumidity { hours: humid_hours });
    }

    patterns
}

fn newest(window: &[Observation], n: usize) -> &[Observation] {
    &window[..window.len().min(n)]
}
