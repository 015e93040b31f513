//! Narrative generation for insights reports
//!
//! A single call is made to the configured [`TextGenerator`]. Any failure,
//! including an unparseable reply, degrades to a deterministic fallback
//! narrative.

use std::sync::Arc;

use serde_json::{Map, Value};
use shared::{ActivitySuggestions, NarrativeSource, TemperatureTrend, WindowCondition};

use crate::config::GeminiConfig;
use crate::external::{GenerationError, GenerationRequest, TextGenerator};
use crate::services::patterns::{AlertKind, WeatherPattern};
use crate::services::statistics::{round_half_up, WindowStatistics};

/// Model reported when no generator is configured
pub const NO_MODEL: &str = "none";

const FALLBACK_NOTICE: &str =
    "AI analysis service is currently unavailable. Insights are based on local rule-based analysis.";

const FALLBACK_RECOMMENDATIONS: [&str; 2] = [
    "Check the local forecast before planning outdoor activities",
    "Stay hydrated and dress for the current conditions",
];

/// Rule-based findings handed to the generator
#[derive(Debug, Clone, Copy)]
pub struct NarrativeInput<'a> {
    pub statistics: &'a WindowStatistics,
    pub condition: WindowCondition,
    pub alerts: &'a [AlertKind],
    pub patterns: &'a [WeatherPattern],
    /// City of the newest observation
    pub city: Option<&'a str>,
}

/// Narrative part of a report
#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub textual_summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub forecast: String,
    pub health_impact: String,
    pub activities: ActivitySuggestions,
    pub source: NarrativeSource,
    pub model: String,
}

impl Narrative {
    /// Deterministic narrative used whenever generation is not possible
    pub fn fallback(model: &str) -> Self {
        Self {
            textual_summary: FALLBACK_NOTICE.to_string(),
            key_findings: Vec::new(),
            recommendations: FALLBACK_RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
            forecast: FALLBACK_NOTICE.to_string(),
            health_impact: FALLBACK_NOTICE.to_string(),
            activities: ActivitySuggestions::default(),
            source: NarrativeSource::Fallback,
            model: model.to_string(),
        }
    }
}

/// Wraps an optional text generator with the call settings
#[derive(Clone)]
pub struct NarrativeGenerator {
    generator: Option<Arc<dyn TextGenerator>>,
    max_output_tokens: u32,
    temperature: f32,
}

impl NarrativeGenerator {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, max_output_tokens: u32, temperature: f32) -> Self {
        Self {
            generator,
            max_output_tokens,
            temperature,
        }
    }

    pub fn from_config(generator: Option<Arc<dyn TextGenerator>>, config: &GeminiConfig) -> Self {
        Self::new(generator, config.max_output_tokens, config.temperature)
    }

    /// Generator that always produces the fallback narrative
    pub fn disabled() -> Self {
        Self::new(None, 1024, 0.3)
    }

    pub fn model(&self) -> &str {
        self.generator.as_deref().map_or(NO_MODEL, |g| g.model())
    }

    pub async fn generate(&self, input: &NarrativeInput<'_>) -> Narrative {
        let Some(generator) = self.generator.as_deref() else {
            tracing::debug!("No text generator configured, using fallback narrative");
            return Narrative::fallback(NO_MODEL);
        };

        let request = GenerationRequest {
            prompt: build_prompt(input),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        };

        let result = generator
            .generate(&request)
            .await
            .and_then(|reply| parse_reply(&reply));

        match result {
            Ok(reply) => reply.into_narrative(generator.model()),
            Err(e) => {
                tracing::warn!(error = %e, model = generator.model(), "Narrative generation failed, using fallback");
                Narrative::fallback(generator.model())
            }
        }
    }
}

/// Build the generation prompt from the rule-based findings
pub fn build_prompt(input: &NarrativeInput<'_>) -> String {
    let stats = input.statistics;
    let summary = stats.to_summary();
    let list = |items: Vec<String>| {
        if items.is_empty() {
            "none".to_string()
        } else {
            items.join("; ")
        }
    };

    format!(
        r#"You are a meteorologist. Analyse the weather data below for {city} and answer in {language}.

Statistics over the last {records} observations:
- Average temperature: {avg_temp}°C (min {min_temp}°C, max {max_temp}°C)
- Average humidity: {avg_humidity}%
- Average wind speed: {avg_wind} km/h
- Temperature trend: {trend}
- Comfort score: {comfort}/100
- Condition: {condition}
- Alerts: {alerts}
- Patterns: {patterns}

Respond ONLY with a JSON object of this exact shape, without markdown:
{{
  "textualSummary": "two or three sentences",
  "keyFindings": ["finding"],
  "recommendations": ["recommendation"],
  "forecast": "short outlook for the next hours",
  "healthImpact": "effects on health and wellbeing",
  "activities": {{ "recommended": ["activity"], "avoid": ["activity"] }},
  "condition": "{condition}",
  "alerts": ["alert"],
  "patterns": ["pattern"]
}}"#,
        city = input.city.unwrap_or("the monitored location"),
        language = "English",
        records = summary.total_records,
        avg_temp = summary.average_temperature,
        min_temp = summary.min_temperature,
        max_temp = summary.max_temperature,
        avg_humidity = summary.average_humidity,
        avg_wind = round_half_up(stats.average_wind_speed, 1),
        trend = trend_label(summary.temperature_trend),
        comfort = summary.comfort_score,
        condition = input.condition.as_str(),
        alerts = list(input.alerts.iter().map(|a| a.message().to_string()).collect()),
        patterns = list(input.patterns.iter().map(|p| p.to_string()).collect()),
    )
}

/// Fields read from a generator reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReply {
    pub textual_summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub forecast: String,
    pub health_impact: String,
    pub activities: ActivitySuggestions,
}

impl ParsedReply {
    fn into_narrative(self, model: &str) -> Narrative {
        Narrative {
            textual_summary: self.textual_summary,
            key_findings: self.key_findings,
            recommendations: self.recommendations,
            forecast: self.forecast,
            health_impact: self.health_impact,
            activities: self.activities,
            source: NarrativeSource::Gemini,
            model: model.to_string(),
        }
    }
}

/// Parse a raw reply into narrative fields
///
/// Accepts fenced or prose-wrapped replies. Missing or wrong-typed fields
/// become empty values; only a reply with no parseable object is an error.
pub fn parse_reply(reply: &str) -> Result<ParsedReply, GenerationError> {
    let span = extract_json_object(strip_fence(reply))
        .ok_or_else(|| GenerationError::InvalidResponse("reply contains no JSON object".to_string()))?;

    let value: Value = serde_json::from_str(span)
        .map_err(|e| GenerationError::InvalidResponse(format!("reply is not valid JSON: {}", e)))?;
    let Value::Object(fields) = value else {
        return Err(GenerationError::InvalidResponse("reply is not a JSON object".to_string()));
    };

    let activities = match fields.get("activities") {
        Some(Value::Object(activities)) => ActivitySuggestions {
            recommended: string_list(activities, "recommended"),
            avoid: string_list(activities, "avoid"),
        },
        _ => ActivitySuggestions::default(),
    };

    Ok(ParsedReply {
        textual_summary: string_field(&fields, "textualSummary"),
        key_findings: string_list(&fields, "keyFindings"),
        recommendations: string_list(&fields, "recommendations"),
        forecast: string_field(&fields, "forecast"),
        health_impact: string_field(&fields, "healthImpact"),
        activities,
    })
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

fn string_list(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    match fields.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn strip_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string, e.g. ```json
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// First balanced `{...}` span, ignoring braces inside JSON strings
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// One-paragraph summary of the window statistics
pub fn textual_summary(stats: &WindowStatistics, condition: WindowCondition) -> String {
    let days = stats.total_records.div_ceil(24);
    let day_word = if days == 1 { "day" } else { "days" };
    let sentence_end = match trend_phrase(stats.temperature_trend) {
        Some(phrase) => format!("{} {}", condition_phrase(condition), phrase),
        None => condition_phrase(condition).to_string(),
    };

    format!(
        "Over the last {} {}, the average temperature was {}°C with {}% humidity. The weather is {}.",
        days,
        day_word,
        round_half_up(stats.average_temperature, 0),
        round_half_up(stats.average_humidity, 0),
        sentence_end,
    )
}

/// Rule-based recommendations; `comfort_score` is the unrounded score
pub fn generate_recommendations(
    condition: WindowCondition,
    alerts: &[AlertKind],
    comfort_score: f64,
    patterns: &[WeatherPattern],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if comfort_score < 30.0 {
        recommendations.push("Uncomfortable weather conditions - plan indoor activities");
    } else if comfort_score > 80.0 {
        recommendations.push("Excellent weather conditions - ideal for outdoor activities");
    }

    match condition {
        WindowCondition::VeryHot => recommendations.push("Use sunscreen and stay hydrated"),
        WindowCondition::Rainy => recommendations.push("Take an umbrella and avoid flood-prone areas"),
        WindowCondition::Cold | WindowCondition::VeryCold => {
            recommendations.push("Wear layered clothing and protect your extremities")
        }
        _ => {}
    }

    if patterns.iter().any(|p| matches!(p, WeatherPattern::Rain { .. })) {
        recommendations.push("Prepare for consecutive rainy days");
    }
    if patterns
        .iter()
        .any(|p| matches!(p, WeatherPattern::ThermalVolatility { .. }))
    {
        recommendations.push("Expect temperature swings - dress in layers");
    }
    if alerts.contains(&AlertKind::VeryHighHumidity) {
        recommendations.push("Take care of respiratory issues due to high humidity");
    }

    recommendations.into_iter().map(str::to_string).collect()
}

fn condition_phrase(condition: WindowCondition) -> &'static str {
    match condition {
        WindowCondition::Rainy => "rainy",
        WindowCondition::VeryHot => "very hot",
        WindowCondition::HotHumid => "hot and humid",
        WindowCondition::Hot => "hot",
        WindowCondition::VeryCold => "very cold",
        WindowCondition::Cold => "cold",
        WindowCondition::VeryHumid => "very humid",
        WindowCondition::Pleasant => "pleasant",
    }
}

fn trend_phrase(trend: TemperatureTrend) -> Option<&'static str> {
    match trend {
        TemperatureTrend::RisingFast => Some("with a rapid warming trend"),
        TemperatureTrend::Rising => Some("with a slight warming trend"),
        TemperatureTrend::FallingFast => Some("with a rapid cooling trend"),
        TemperatureTrend::Falling => Some("with a slight cooling trend"),
        TemperatureTrend::Stable => Some("with stable temperatures"),
        TemperatureTrend::InsufficientData => None,
    }
}

fn trend_label(trend: TemperatureTrend) -> &'static str {
    match trend {
        TemperatureTrend::RisingFast => "rising fast",
        TemperatureTrend::Rising => "rising",
        TemperatureTrend::Stable => "stable",
        TemperatureTrend::Falling => "falling",
        TemperatureTrend::FallingFast => "falling fast",
        TemperatureTrend::InsufficientData => "not enough data",
    }
}
