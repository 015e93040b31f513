//! Insights computation over the recent observation window
//!
//! Reports are recomputed on every call; nothing is cached.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    AiInsights, InsightsOutcome, InsightsReport, InsufficientData, NarrativeSource, RefreshedInsights,
    WindowCondition,
};

use crate::error::AppResult;
use crate::services::narrative::{
    generate_recommendations, textual_summary, Narrative, NarrativeGenerator, NarrativeInput,
};
use crate::services::observation::ObservationSource;
use crate::services::patterns::{classify_window, detect_patterns, generate_alerts, AlertKind, WeatherPattern};
use crate::services::statistics::{compute_statistics, WindowStatistics};

pub const INSUFFICIENT_DATA_MESSAGE: &str = "Insufficient data to generate insights";
pub const REFRESH_MESSAGE: &str = "Insights refreshed successfully";

/// Default number of observations analysed, one week of hourly readings
pub const DEFAULT_WINDOW_SIZE: u32 = 168;

/// Insights service
#[derive(Clone)]
pub struct InsightsService {
    source: Arc<dyn ObservationSource>,
    narrator: NarrativeGenerator,
    window_size: u32,
}

impl InsightsService {
    pub fn new(source: Arc<dyn ObservationSource>, narrator: NarrativeGenerator, window_size: u32) -> Self {
        Self {
            source,
            narrator,
            window_size,
        }
    }

    /// Model identifier narratives are generated with
    pub fn narrative_model(&self) -> &str {
        self.narrator.model()
    }

    /// Compute a report over the most recent observations
    pub async fn compute_insights(&self) -> AppResult<InsightsOutcome> {
        let window = self.source.fetch_recent(self.window_size).await?;

        let Some(stats) = compute_statistics(&window) else {
            tracing::debug!("No observations available for insights");
            return Ok(InsightsOutcome::InsufficientData(InsufficientData {
                message: INSUFFICIENT_DATA_MESSAGE.to_string(),
                total_records: 0,
            }));
        };

        let condition = classify_window(&window, stats.average_temperature, stats.average_humidity);
        let alerts = generate_alerts(&window, stats.average_temperature, stats.average_humidity);
        let patterns = detect_patterns(&window);

        let narrative = self
            .narrator
            .generate(&NarrativeInput {
                statistics: &stats,
                condition,
                alerts: &alerts,
                patterns: &patterns,
                city: window.first().map(|o| o.location.city.as_str()),
            })
            .await;

        tracing::debug!(
            records = stats.total_records,
            condition = condition.as_str(),
            alerts = alerts.len(),
            patterns = patterns.len(),
            "Computed weather insights"
        );

        Ok(InsightsOutcome::Report(compose_report(
            &stats,
            condition,
            &alerts,
            &patterns,
            narrative,
            Utc::now(),
        )))
    }

    /// Same computation as [`Self::compute_insights`], stamped with a refresh message
    pub async fn refresh_insights(&self) -> AppResult<RefreshedInsights> {
        let outcome = self.compute_insights().await?;
        Ok(RefreshedInsights::new(outcome, REFRESH_MESSAGE, Utc::now()))
    }
}

/// Merge rule-based findings with the narrative
///
/// Condition, alerts and patterns always come from the rules.
/// A fallback narrative's summary notice is replaced by the statistics template.
pub fn compose_report(
    stats: &WindowStatistics,
    condition: WindowCondition,
    alerts: &[AlertKind],
    patterns: &[WeatherPattern],
    narrative: Narrative,
    generated_at: DateTime<Utc>,
) -> InsightsReport {
    let rule_summary = textual_summary(stats, condition);
    let rule_recommendations = generate_recommendations(condition, alerts, stats.comfort_score, patterns);

    let (summary_text, recommendations) = match narrative.source {
        NarrativeSource::Gemini => {
            let text = if narrative.textual_summary.is_empty() {
                rule_summary
            } else {
                narrative.textual_summary
            };
            let recommendations = if narrative.recommendations.is_empty() {
                rule_recommendations
            } else {
                narrative.recommendations
            };
            (text, recommendations)
        }
        NarrativeSource::Fallback => {
            let mut recommendations = rule_recommendations;
            for canned in narrative.recommendations {
                if !recommendations.contains(&canned) {
                    recommendations.push(canned);
                }
            }
            (rule_summary, recommendations)
        }
    };

    InsightsReport {
        summary: stats.to_summary(),
        ai_insights: AiInsights {
            condition,
            alerts: alerts.iter().map(|a| a.message().to_string()).collect(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            textual_summary: summary_text,
            recommendations,
            key_findings: narrative.key_findings,
            forecast: narrative.forecast,
            health_impact: narrative.health_impact,
            activities: narrative.activities,
            source: narrative.source,
            model: narrative.model,
        },
        generated_at,
    }
}
