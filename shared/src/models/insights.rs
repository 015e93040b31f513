//! Insights report models
//!
//! Reports are derived from the recent observation window on every request
//! and are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of the temperature over the last two 24-observation windows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureTrend {
    RisingFast,
    Rising,
    Stable,
    Falling,
    FallingFast,
    InsufficientData,
}

/// Label for the whole observation window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WindowCondition {
    Rainy,
    VeryHot,
    HotHumid,
    Hot,
    VeryCold,
    Cold,
    VeryHumid,
    Pleasant,
}

impl WindowCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowCondition::Rainy => "rainy",
            WindowCondition::VeryHot => "very_hot",
            WindowCondition::HotHumid => "hot_humid",
            WindowCondition::Hot => "hot",
            WindowCondition::VeryCold => "very_cold",
            WindowCondition::Cold => "cold",
            WindowCondition::VeryHumid => "very_humid",
            WindowCondition::Pleasant => "pleasant",
        }
    }
}

/// Where the narrative text came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    Gemini,
    Fallback,
}

/// Aggregate statistics over the observation window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightsSummary {
    pub total_records: usize,
    pub average_temperature: f64,
    pub average_humidity: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub temperature_trend: TemperatureTrend,
    pub comfort_score: u8,
}

/// Activities suggested by the narrative
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActivitySuggestions {
    pub recommended: Vec<String>,
    pub avoid: Vec<String>,
}

/// Rule-based findings enriched with the narrative
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    pub condition: WindowCondition,
    pub alerts: Vec<String>,
    pub patterns: Vec<String>,
    pub textual_summary: String,
    pub recommendations: Vec<String>,
    pub key_findings: Vec<String>,
    pub forecast: String,
    pub health_impact: String,
    pub activities: ActivitySuggestions,
    pub source: NarrativeSource,
    pub model: String,
}

/// Full insights report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightsReport {
    pub summary: InsightsSummary,
    pub ai_insights: AiInsights,
    pub generated_at: DateTime<Utc>,
}

/// Returned instead of a report when the window is empty
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsufficientData {
    pub message: String,
    pub total_records: usize,
}

/// Result of an insights computation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InsightsOutcome {
    Report(InsightsReport),
    InsufficientData(InsufficientData),
}

impl InsightsOutcome {
    pub fn report(&self) -> Option<&InsightsReport> {
        match self {
            InsightsOutcome::Report(report) => Some(report),
            InsightsOutcome::InsufficientData(_) => None,
        }
    }
}

/// Insights returned by an explicit refresh
///
/// For an empty window the insufficient-data message replaces the refresh
/// message and only `totalRecords` is added.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedInsights {
    pub message: String,
    pub last_updated: DateTime<Utc>,
    #[serde(flatten)]
    pub report: Option<InsightsReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<usize>,
}

impl RefreshedInsights {
    pub fn new(outcome: InsightsOutcome, message: &str, last_updated: DateTime<Utc>) -> Self {
        match outcome {
            InsightsOutcome::Report(report) => Self {
                message: message.to_string(),
                last_updated,
                report: Some(report),
                total_records: None,
            },
            InsightsOutcome::InsufficientData(empty) => Self {
                message: empty.message,
                last_updated,
                report: None,
                total_records: Some(empty.total_records),
            },
        }
    }
}
