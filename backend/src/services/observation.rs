//! Observation storage, querying and export

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    classify_observation, validate_observation, CreateObservationInput, CurrentConditions, DateRange,
    ForecastProbabilities, HourlyForecast, Location, Observation, PaginatedResponse, Pagination,
    PaginationMeta,
};
use rust_xlsxwriter::{Workbook, XlsxError};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Column order of the CSV and XLSX exports
pub const CSV_HEADER: [&str; 8] = [
    "timestamp",
    "city",
    "temperature",
    "humidity",
    "wind_speed",
    "weather_code",
    "condition",
    "source",
];

/// Supplies the most recent observations, newest first by ingestion time
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch_recent(&self, limit: u32) -> AppResult<Vec<Observation>>;
}

/// PostgreSQL-backed observation store
#[derive(Clone)]
pub struct ObservationService {
    db: PgPool,
}

const OBSERVATION_COLUMNS: &str = r#"
    id, observed_at, city, latitude, longitude,
    temperature, humidity, wind_speed, weather_code, precipitation,
    forecast_probabilities, forecast, condition_classification, source, created_at
"#;

#[derive(Debug, FromRow)]
struct ObservationRow {
    id: Uuid,
    observed_at: DateTime<Utc>,
    city: String,
    latitude: f64,
    longitude: f64,
    temperature: f64,
    humidity: f64,
    wind_speed: f64,
    weather_code: i32,
    precipitation: f64,
    forecast_probabilities: Option<Json<ForecastProbabilities>>,
    forecast: Option<Json<HourlyForecast>>,
    condition_classification: Option<String>,
    source: String,
    created_at: DateTime<Utc>,
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Observation {
            id: row.id,
            timestamp: row.observed_at,
            location: Location {
                city: row.city,
                latitude: row.latitude,
                longitude: row.longitude,
            },
            current: CurrentConditions {
                temperature: row.temperature,
                humidity: row.humidity,
                wind_speed: row.wind_speed,
                weather_code: row.weather_code,
                precipitation: row.precipitation,
            },
            forecast_probabilities: row.forecast_probabilities.map(|Json(p)| p),
            forecast: row.forecast.map(|Json(f)| f),
            condition_classification: row
                .condition_classification
                .and_then(|c| c.parse().ok()),
            source: row.source,
            created_at: row.created_at,
        }
    }
}

impl ObservationService {
    /// Create a new ObservationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Validate, classify and store an observation
    ///
    /// Any classification sent by the collector is replaced.
    pub async fn create(&self, input: CreateObservationInput) -> AppResult<Observation> {
        validate_observation(&input)?;

        let condition = classify_observation(&input.current);
        let CreateObservationInput {
            timestamp,
            location,
            current,
            forecast_probabilities,
            forecast,
            source,
            ..
        } = input;

        let query = format!(
            r#"
            INSERT INTO weather_observations (
                id, observed_at, city, latitude, longitude,
                temperature, humidity, wind_speed, weather_code, precipitation,
                forecast_probabilities, forecast, condition_classification, source, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW())
            RETURNING {}
            "#,
            OBSERVATION_COLUMNS
        );

        let row = sqlx::query_as::<_, ObservationRow>(&query)
            .bind(Uuid::new_v4())
            .bind(timestamp)
            .bind(&location.city)
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(current.temperature)
            .bind(current.humidity)
            .bind(current.wind_speed)
            .bind(current.weather_code)
            .bind(current.precipitation)
            .bind(forecast_probabilities.map(Json))
            .bind(forecast.map(Json))
            .bind(condition.as_str())
            .bind(&source)
            .fetch_one(&self.db)
            .await?;

        tracing::debug!(
            id = %row.id,
            city = %row.city,
            condition = condition.as_str(),
            "Stored weather observation"
        );

        Ok(row.into())
    }

    /// List observations newest first by reading time
    pub async fn list(
        &self,
        pagination: &Pagination,
        range: &DateRange,
    ) -> AppResult<PaginatedResponse<Observation>> {
        let total = self.count(range).await?;

        let query = format!(
            r#"
            SELECT {}
            FROM weather_observations
            WHERE ($1::timestamptz IS NULL OR observed_at >= $1)
              AND ($2::timestamptz IS NULL OR observed_at <= $2)
            ORDER BY observed_at DESC
            LIMIT $3 OFFSET $4
            "#,
            OBSERVATION_COLUMNS
        );

        let rows = sqlx::query_as::<_, ObservationRow>(&query)
            .bind(range.start)
            .bind(range.end)
            .bind(i64::from(pagination.limit))
            .bind(pagination.offset() as i64)
            .fetch_all(&self.db)
            .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Observation::from).collect(),
            meta: PaginationMeta::new(pagination, total),
        })
    }

    /// Count observations in the range
    pub async fn count(&self, range: &DateRange) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM weather_observations
            WHERE ($1::timestamptz IS NULL OR observed_at >= $1)
              AND ($2::timestamptz IS NULL OR observed_at <= $2)
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;

        Ok(total.max(0) as u64)
    }

    /// Get a single observation by ID
    pub async fn get(&self, id: Uuid) -> AppResult<Observation> {
        let query = format!(
            "SELECT {} FROM weather_observations WHERE id = $1",
            OBSERVATION_COLUMNS
        );

        let row = sqlx::query_as::<_, ObservationRow>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Weather observation".to_string()))?;

        Ok(row.into())
    }

    /// Export observations in the range as CSV, newest first
    pub async fn export_csv(&self, range: &DateRange) -> AppResult<String> {
        let observations = self.fetch_for_export(range).await?;
        tracing::debug!(rows = observations.len(), "Exporting observations as CSV");

        observations_to_csv(&observations)
    }

    /// Export observations in the range as an XLSX workbook, newest first
    pub async fn export_xlsx(&self, range: &DateRange) -> AppResult<Vec<u8>> {
        let observations = self.fetch_for_export(range).await?;
        tracing::debug!(rows = observations.len(), "Exporting observations as XLSX");

        observations_to_xlsx(&observations)
    }

    async fn fetch_for_export(&self, range: &DateRange) -> AppResult<Vec<Observation>> {
        let query = format!(
            r#"
            SELECT {}
            FROM weather_observations
            WHERE ($1::timestamptz IS NULL OR observed_at >= $1)
              AND ($2::timestamptz IS NULL OR observed_at <= $2)
            ORDER BY observed_at DESC
            "#,
            OBSERVATION_COLUMNS
        );

        let rows = sqlx::query_as::<_, ObservationRow>(&query)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(Observation::from).collect())
    }
}

#[async_trait]
impl ObservationSource for ObservationService {
    async fn fetch_recent(&self, limit: u32) -> AppResult<Vec<Observation>> {
        let query = format!(
            "SELECT {} FROM weather_observations ORDER BY created_at DESC LIMIT $1",
            OBSERVATION_COLUMNS
        );

        let rows = sqlx::query_as::<_, ObservationRow>(&query)
            .bind(i64::from(limit))
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(Observation::from).collect())
    }
}

/// One CSV record for an observation
pub fn csv_record(observation: &Observation) -> [String; 8] {
    [
        observation.timestamp.to_rfc3339(),
        observation.location.city.clone(),
        observation.current.temperature.to_string(),
        observation.current.humidity.to_string(),
        observation.current.wind_speed.to_string(),
        observation.current.weather_code.to_string(),
        observation
            .condition_classification
            .map_or("N/A", |c| c.as_str())
            .to_string(),
        observation.source.clone(),
    ]
}

/// Render observations as CSV with a header row
pub fn observations_to_csv(observations: &[Observation]) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|e| AppError::Export(e.to_string()))?;
    for observation in observations {
        writer
            .write_record(csv_record(observation))
            .map_err(|e| AppError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::Export(e.to_string()))
}

/// Cell of an exported spreadsheet row
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Text(String),
    Number(f64),
}

/// One spreadsheet row for an observation, numeric columns kept as numbers
pub fn sheet_row(observation: &Observation) -> [SheetCell; 8] {
    [
        SheetCell::Text(observation.timestamp.to_rfc3339()),
        SheetCell::Text(observation.location.city.clone()),
        SheetCell::Number(observation.current.temperature),
        SheetCell::Number(observation.current.humidity),
        SheetCell::Number(observation.current.wind_speed),
        SheetCell::Number(f64::from(observation.current.weather_code)),
        SheetCell::Text(
            observation
                .condition_classification
                .map_or("N/A", |c| c.as_str())
                .to_string(),
        ),
        SheetCell::Text(observation.source.clone()),
    ]
}

/// Render observations as a single-sheet XLSX workbook with a header row
pub fn observations_to_xlsx(observations: &[Observation]) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Weather Data").map_err(xlsx_error)?;

    for (col, title) in CSV_HEADER.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *title)
            .map_err(xlsx_error)?;
    }

    for (index, observation) in observations.iter().enumerate() {
        let row = (index + 1) as u32;
        for (col, cell) in sheet_row(observation).iter().enumerate() {
            let col = col as u16;
            match cell {
                SheetCell::Text(text) => worksheet.write_string(row, col, text),
                SheetCell::Number(value) => worksheet.write_number(row, col, *value),
            }
            .map_err(xlsx_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

fn xlsx_error(e: XlsxError) -> AppError {
    AppError::Export(e.to_string())
}
