//! Observation builders for unit tests

use chrono::{Duration, TimeZone, Utc};
use shared::{CurrentConditions, ForecastProbabilities, Location, Observation};
use uuid::Uuid;

pub fn observation(temperature: f64, humidity: f64, wind_speed: f64, precip_prob: f64) -> Observation {
    let at = Utc.with_ymd_and_hms(2025, 12, 4, 12, 0, 0).unwrap();
    Observation {
        id: Uuid::new_v4(),
        timestamp: at,
        location: Location {
            city: "Recife".to_string(),
            latitude: -8.0542,
            longitude: -34.8813,
        },
        current: CurrentConditions {
            temperature,
            humidity,
            wind_speed,
            weather_code: 1,
            precipitation: 0.0,
        },
        forecast_probabilities: Some(ForecastProbabilities {
            max_precipitation_prob: precip_prob,
            avg_precipitation_prob: precip_prob / 2.0,
            ..Default::default()
        }),
        forecast: None,
        condition_classification: None,
        source: "test".to_string(),
        created_at: at,
    }
}

/// Hourly observations, newest first, with the given temperatures
pub fn observations_with_temps(temps: &[f64]) -> Vec<Observation> {
    let newest = Utc.with_ymd_and_hms(2025, 12, 4, 12, 0, 0).unwrap();
    temps
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let mut o = observation(t, 50.0, 10.0, 10.0);
            o.timestamp = newest - Duration::hours(i as i64);
            o.created_at = o.timestamp;
            o
        })
        .collect()
}
