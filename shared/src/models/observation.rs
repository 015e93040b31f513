//! Weather observation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Where a reading was taken
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct Location {
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "longitude must be between -180 and 180"
    ))]
    pub longitude: f64,
}

/// Conditions at the time of the reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct CurrentConditions {
    /// Air temperature in °C
    #[validate(range(
        min = -100.0,
        max = 100.0,
        message = "temperature must be between -100 and 100"
    ))]
    pub temperature: f64,
    /// Relative humidity in percent
    #[validate(range(min = 0.0, max = 100.0, message = "humidity must be between 0 and 100"))]
    pub humidity: f64,
    /// Wind speed in km/h
    #[validate(range(min = 0.0, message = "wind_speed cannot be negative"))]
    pub wind_speed: f64,
    /// WMO weather interpretation code
    pub weather_code: i32,
    /// Precipitation in mm
    #[validate(range(min = 0.0, message = "precipitation cannot be negative"))]
    pub precipitation: f64,
}

/// Precipitation probabilities and 24h temperature summary computed by the collector
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct ForecastProbabilities {
    #[serde(default)]
    #[validate(range(
        min = 0.0,
        max = 100.0,
        message = "max_precipitation_prob must be between 0 and 100"
    ))]
    pub max_precipitation_prob: f64,
    #[serde(default)]
    #[validate(range(
        min = 0.0,
        max = 100.0,
        message = "avg_precipitation_prob must be between 0 and 100"
    ))]
    pub avg_precipitation_prob: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_min_24h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_max_24h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_avg_24h: Option<f64>,
}

/// Hourly forecast series for the next 24 hours
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HourlyForecast {
    #[serde(default)]
    pub next_24h_temps: Vec<f64>,
    #[serde(default)]
    pub precipitation_probability: Vec<f64>,
}

/// Label assigned to a single observation when it is stored
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObservationCondition {
    Rainy,
    Hot,
    Cold,
    Humid,
    Pleasant,
}

impl ObservationCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationCondition::Rainy => "rainy",
            ObservationCondition::Hot => "hot",
            ObservationCondition::Cold => "cold",
            ObservationCondition::Humid => "humid",
            ObservationCondition::Pleasant => "pleasant",
        }
    }
}

impl std::fmt::Display for ObservationCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObservationCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rainy" => Ok(ObservationCondition::Rainy),
            "hot" => Ok(ObservationCondition::Hot),
            "cold" => Ok(ObservationCondition::Cold),
            "humid" => Ok(ObservationCondition::Humid),
            "pleasant" => Ok(ObservationCondition::Pleasant),
            other => Err(format!("unknown observation condition: {}", other)),
        }
    }
}

/// A stored weather reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub location: Location,
    pub current: CurrentConditions,
    #[serde(default, alias = "analytics", skip_serializing_if = "Option::is_none")]
    pub forecast_probabilities: Option<ForecastProbabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<HourlyForecast>,
    pub condition_classification: Option<ObservationCondition>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl Observation {
    /// Maximum precipitation probability for the upcoming period, 0 when unknown
    pub fn max_precipitation_prob(&self) -> f64 {
        self.forecast_probabilities
            .as_ref()
            .map(|p| p.max_precipitation_prob)
            .unwrap_or(0.0)
    }
}

/// Payload posted by collectors
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateObservationInput {
    pub timestamp: DateTime<Utc>,
    #[validate]
    pub location: Location,
    #[validate]
    pub current: CurrentConditions,
    #[serde(default, alias = "analytics")]
    #[validate]
    pub forecast_probabilities: Option<ForecastProbabilities>,
    #[serde(default)]
    pub forecast: Option<HourlyForecast>,
    /// Ignored, the backend always classifies on write
    #[serde(default)]
    pub condition_classification: Option<String>,
    #[validate(length(min = 1, message = "source is required"))]
    pub source: String,
}

/// Classify a single observation at write time
///
/// Rules are applied in order: precipitation, heat, cold, humidity.
pub fn classify_observation(current: &CurrentConditions) -> ObservationCondition {
    if current.precipitation > 5.0 {
        ObservationCondition::Rainy
    } else if current.temperature > 30.0 {
        ObservationCondition::Hot
    } else if current.temperature < 10.0 {
        ObservationCondition::Cold
    } else if current.humidity > 80.0 {
        ObservationCondition::Humid
    } else {
        ObservationCondition::Pleasant
    }
}
