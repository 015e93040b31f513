//! Insights integration tests
//!
//! Drives the insights service through in-memory fakes of the observation
//! store and the text generator:
//! - Window statistics and their bounds
//! - Trend detection
//! - Classification, alerts and patterns
//! - Narrative fallback and refresh behaviour

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use shared::{
    CurrentConditions, ForecastProbabilities, InsightsOutcome, InsightsReport, Location, NarrativeSource,
    Observation, TemperatureTrend, WindowCondition,
};
use uuid::Uuid;

use weather_insights_backend::error::AppResult;
use weather_insights_backend::external::{GenerationError, GenerationRequest, TextGenerator};
use weather_insights_backend::services::insights::{INSUFFICIENT_DATA_MESSAGE, REFRESH_MESSAGE};
use weather_insights_backend::services::statistics::compute_statistics;
use weather_insights_backend::services::{InsightsService, NarrativeGenerator, ObservationSource};

// ============================================================================
// Fakes
// ============================================================================

/// Observation store holding a fixed window, newest first
struct InMemorySource {
    observations: Vec<Observation>,
    requested_limits: Mutex<Vec<u32>>,
}

impl InMemorySource {
    fn new(observations: Vec<Observation>) -> Arc<Self> {
        Arc::new(Self {
            observations,
            requested_limits: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ObservationSource for InMemorySource {
    async fn fetch_recent(&self, limit: u32) -> AppResult<Vec<Observation>> {
        self.requested_limits.lock().unwrap().push(limit);
        Ok(self.observations.iter().take(limit as usize).cloned().collect())
    }
}

/// Generator returning a canned reply and counting calls
struct ScriptedGenerator {
    reply: Result<String, GenerationError>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(error: GenerationError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn reading(temperature: f64, humidity: f64, wind_speed: f64, precip_prob: f64) -> Observation {
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
            weather_code: 2,
            precipitation: 0.0,
        },
        forecast_probabilities: Some(ForecastProbabilities {
            max_precipitation_prob: precip_prob,
            avg_precipitation_prob: precip_prob / 2.0,
            ..Default::default()
        }),
        forecast: None,
        condition_classification: None,
        source: "collector".to_string(),
        created_at: at,
    }
}

/// Hourly readings, newest first
fn hourly(temps: &[f64]) -> Vec<Observation> {
    let newest = Utc.with_ymd_and_hms(2025, 12, 4, 12, 0, 0).unwrap();
    temps
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            let mut o = reading(t, 60.0, 10.0, 10.0);
            o.timestamp = newest - Duration::hours(i as i64);
            o.created_at = o.timestamp;
            o
        })
        .collect()
}

fn service(observations: Vec<Observation>, generator: Option<Arc<dyn TextGenerator>>) -> InsightsService {
    InsightsService::new(
        InMemorySource::new(observations),
        NarrativeGenerator::new(generator, 1024, 0.3),
        168,
    )
}

async fn report(service: &InsightsService) -> InsightsReport {
    match service.compute_insights().await.unwrap() {
        InsightsOutcome::Report(report) => report,
        other => panic!("expected a report, got {:?}", other),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Empty store yields the insufficient-data sentinel
    #[tokio::test]
    async fn test_empty_window_is_insufficient() {
        let outcome = service(Vec::new(), None).compute_insights().await.unwrap();

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["totalRecords"], 0);
        assert_eq!(value["message"], INSUFFICIENT_DATA_MESSAGE);
        assert!(value.get("summary").is_none());
    }

    /// Window is bounded by the configured size
    #[tokio::test]
    async fn test_window_limited_to_168() {
        let source = InMemorySource::new(hourly(&[20.0; 200]));
        let service = InsightsService::new(source.clone(), NarrativeGenerator::disabled(), 168);

        let report = report(&service).await;
        assert_eq!(report.summary.total_records, 168);
        assert_eq!(*source.requested_limits.lock().unwrap(), vec![168]);
    }

    /// 24 hot readings classify as very hot with an extreme heat alert
    #[tokio::test]
    async fn test_very_hot_window() {
        let window: Vec<_> = (0..24).map(|_| reading(40.0, 50.0, 10.0, 10.0)).collect();
        let report = report(&service(window, None)).await;

        assert_eq!(report.ai_insights.condition, WindowCondition::VeryHot);
        assert!(report
            .ai_insights
            .alerts
            .iter()
            .any(|a| a.contains("Extreme heat")));
        assert!(report
            .ai_insights
            .recommendations
            .iter()
            .any(|r| r.contains("sunscreen")));
    }

    /// Newest day five degrees warmer than the previous one
    #[tokio::test]
    async fn test_rising_fast_trend() {
        let mut temps = vec![25.0; 24];
        temps.extend(vec![20.0; 24]);
        let report = report(&service(hourly(&temps), None)).await;

        assert_eq!(report.summary.temperature_trend, TemperatureTrend::RisingFast);
        assert!(report.ai_insights.textual_summary.contains("rapid warming"));
    }

    /// Fewer than 48 readings cannot establish a trend
    #[tokio::test]
    async fn test_insufficient_trend_data() {
        let report = report(&service(hourly(&[22.0; 47]), None)).await;
        assert_eq!(report.summary.temperature_trend, TemperatureTrend::InsufficientData);
    }

    /// Exactly 12 rainy hours in 72 is a pattern, 11 is not
    #[tokio::test]
    async fn test_rain_pattern_boundary() {
        let window = |rainy: usize| -> Vec<Observation> {
            (0..72)
                .map(|i| reading(22.0, 60.0, 10.0, if i < rainy { 65.0 } else { 10.0 }))
                .collect()
        };

        let with_pattern = report(&service(window(12), None)).await;
        assert_eq!(with_pattern.ai_insights.patterns.len(), 1);
        assert!(with_pattern.ai_insights.patterns[0].contains("17%"));
        assert!(with_pattern
            .ai_insights
            .recommendations
            .contains(&"Prepare for consecutive rainy days".to_string()));

        let without = report(&service(window(11), None)).await;
        assert!(without.ai_insights.patterns.is_empty());
    }

    /// Generator failure degrades to the fallback narrative
    #[tokio::test]
    async fn test_generator_failure_uses_fallback() {
        let generator = ScriptedGenerator::failing(GenerationError::Transport("connection refused".to_string()));
        let report = report(&service(hourly(&[25.0; 48]), Some(generator.clone()))).await;

        assert_eq!(report.ai_insights.source, NarrativeSource::Fallback);
        assert_eq!(report.ai_insights.model, "scripted-model");
        assert!(!report.ai_insights.textual_summary.is_empty());
        assert!(!report.ai_insights.recommendations.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    /// Reply without any JSON is treated as a failure
    #[tokio::test]
    async fn test_unparseable_reply_uses_fallback() {
        let generator = ScriptedGenerator::replying("The weather looks fine today.");
        let report = report(&service(hourly(&[25.0; 10]), Some(generator))).await;
        assert_eq!(report.ai_insights.source, NarrativeSource::Fallback);
    }

    /// No generator configured means no call and model "none"
    #[tokio::test]
    async fn test_disabled_generator() {
        let report = report(&service(hourly(&[25.0; 10]), None)).await;
        assert_eq!(report.ai_insights.source, NarrativeSource::Fallback);
        assert_eq!(report.ai_insights.model, "none");
    }

    /// Successful reply supplies narrative text while rules keep the labels
    #[tokio::test]
    async fn test_generated_narrative_merged_with_rules() {
        let reply = r#"```json
{
  "textualSummary": "A warm and steady week in Recife.",
  "keyFindings": ["Temperatures held near 25°C"],
  "recommendations": ["Plan outdoor activities in the morning"],
  "forecast": "Similar conditions tomorrow",
  "healthImpact": "Minimal",
  "activities": {"recommended": ["Beach walk"], "avoid": ["Midday runs"]},
  "condition": "rainy",
  "alerts": ["made-up alert"],
  "patterns": []
}
```"#;
        let generator = ScriptedGenerator::replying(reply);
        let report = report(&service(hourly(&[25.0; 48]), Some(generator))).await;

        assert_eq!(report.ai_insights.source, NarrativeSource::Gemini);
        assert_eq!(report.ai_insights.textual_summary, "A warm and steady week in Recife.");
        assert_eq!(report.ai_insights.recommendations, vec!["Plan outdoor activities in the morning"]);
        assert_eq!(report.ai_insights.activities.avoid, vec!["Midday runs"]);
        // rule-based labels win over the reply
        assert_eq!(report.ai_insights.condition, WindowCondition::Pleasant);
        assert!(report.ai_insights.alerts.is_empty());
    }

    /// Two computations over the same window agree
    #[tokio::test]
    async fn test_summary_is_deterministic() {
        let service = service(hourly(&[18.0, 21.5, 24.0, 19.3, 22.2]), None);
        let first = report(&service).await;
        let second = report(&service).await;
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.ai_insights.textual_summary, second.ai_insights.textual_summary);
    }

    /// Refresh carries the message and last update time
    #[tokio::test]
    async fn test_refresh_adds_message() {
        let refreshed = service(hourly(&[22.0; 5]), None).refresh_insights().await.unwrap();
        let value = serde_json::to_value(&refreshed).unwrap();

        assert_eq!(value["message"], REFRESH_MESSAGE);
        assert!(value.get("lastUpdated").is_some());
        assert_eq!(value["summary"]["totalRecords"], 5);
        assert!(value.get("aiInsights").is_some());
    }

    /// Refresh of an empty window keeps the insufficient-data message
    #[tokio::test]
    async fn test_refresh_empty_window() {
        let refreshed = service(Vec::new(), None).refresh_insights().await.unwrap();
        let value = serde_json::to_value(&refreshed).unwrap();

        assert_eq!(value["message"], INSUFFICIENT_DATA_MESSAGE);
        assert_eq!(value["totalRecords"], 0);
        assert!(value.get("summary").is_none());
    }

    /// Report serializes with camelCase fields
    #[tokio::test]
    async fn test_report_wire_shape() {
        let report = report(&service(hourly(&[22.0; 5]), None)).await;
        let value = serde_json::to_value(&report).unwrap();

        assert!(value["summary"]["averageTemperature"].is_number());
        assert!(value["summary"]["comfortScore"].is_u64());
        assert_eq!(value["summary"]["temperatureTrend"], "insufficient_data");
        assert_eq!(value["aiInsights"]["source"], "fallback");
        assert!(value["aiInsights"]["textualSummary"].is_string());
        assert!(value["generatedAt"].is_string());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn temperature_strategy() -> impl Strategy<Value = f64> {
        -50.0f64..55.0
    }

    fn humidity_strategy() -> impl Strategy<Value = f64> {
        0.0f64..=100.0
    }

    fn wind_strategy() -> impl Strategy<Value = f64> {
        0.0f64..120.0
    }

    fn window_strategy() -> impl Strategy<Value = Vec<Observation>> {
        prop::collection::vec(
            (temperature_strategy(), humidity_strategy(), wind_strategy(), 0.0f64..=100.0),
            1..168,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .map(|(t, h, w, p)| reading(t, h, w, p))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Rounded average temperature stays within the window extrema
        #[test]
        fn prop_average_within_extrema(window in window_strategy()) {
            let summary = compute_statistics(&window).unwrap().to_summary();
            prop_assert!(summary.min_temperature <= summary.average_temperature);
            prop_assert!(summary.average_temperature <= summary.max_temperature);
        }

        /// Comfort score is always on the 0-100 scale
        #[test]
        fn prop_comfort_score_bounded(window in window_strategy()) {
            let stats = compute_statistics(&window).unwrap();
            prop_assert!((0.0..=100.0).contains(&stats.comfort_score));
            prop_assert!(stats.to_summary().comfort_score <= 100);
        }

        /// Under 48 observations the trend is never established
        #[test]
        fn prop_short_window_has_no_trend(temps in prop::collection::vec(temperature_strategy(), 1..48)) {
            let stats = compute_statistics(&hourly(&temps)).unwrap();
            prop_assert_eq!(stats.temperature_trend, TemperatureTrend::InsufficientData);
        }

        /// Fallback reports always carry a summary and recommendations
        #[test]
        fn prop_fallback_report_complete(window in window_strategy()) {
            let service = service(window, None);
            let report = tokio_test::block_on(report(&service));
            prop_assert!(!report.ai_insights.textual_summary.is_empty());
            prop_assert!(!report.ai_insights.recommendations.is_empty());
        }
    }
}
