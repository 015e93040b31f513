//! HTTP handlers for weather observation endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{CreateObservationInput, DateRange, Observation, PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::AppState;

/// Store an observation posted by a collector
pub async fn create_observation(
    State(state): State<AppState>,
    payload: Result<Json<CreateObservationInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Observation>)> {
    let Json(input) = payload.map_err(|e| AppError::Validation {
        field: "body".to_string(),
        message: e.body_text(),
    })?;
    let observation = state.observations.create(input).await?;
    Ok((StatusCode::CREATED, Json(observation)))
}

/// Query parameters for listing observations
#[derive(Debug, Default, Deserialize)]
pub struct ListObservationsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ListObservationsQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::clamped(self.page, self.limit)
    }

    pub fn date_range(&self) -> AppResult<DateRange> {
        Ok(DateRange {
            start: parse_date_param("start_date", self.start_date.as_deref(), false)?,
            end: parse_date_param("end_date", self.end_date.as_deref(), true)?,
        })
    }
}

/// Accept RFC 3339 instants or plain dates
///
/// A plain date covers the whole UTC day, so an end date means end of day.
fn parse_date_param(field: &str, value: Option<&str>, end_of_day: bool) -> AppResult<Option<DateTime<Utc>>> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(instant.with_timezone(&Utc)));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| AppError::Validation {
        field: field.to_string(),
        message: format!("{} must be an RFC 3339 timestamp or YYYY-MM-DD date", field),
    })?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };

    Ok(time.map(|t| t.and_utc()))
}

/// List observations, newest first
pub async fn list_observations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListObservationsQuery>,
) -> AppResult<Json<PaginatedResponse<Observation>>> {
    let range = query.date_range()?;
    let page = state.observations.list(&query.pagination(), &range).await?;
    Ok(Json(page))
}

/// Get a single observation
pub async fn get_observation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(observation_id): Path<Uuid>,
) -> AppResult<Json<Observation>> {
    let observation = state.observations.get(observation_id).await?;
    Ok(Json(observation))
}

/// Export observations as a CSV attachment
pub async fn export_observations_csv(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListObservationsQuery>,
) -> AppResult<impl IntoResponse> {
    let range = query.date_range()?;
    let csv = state.observations.export_csv(&range).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"weather-data.csv\""),
        ],
        csv,
    ))
}

/// Export observations as an XLSX attachment
pub async fn export_observations_xlsx(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListObservationsQuery>,
) -> AppResult<impl IntoResponse> {
    let range = query.date_range()?;
    let workbook = state.observations.export_xlsx(&range).await?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"weather-data.xlsx\""),
        ],
        workbook,
    ))
}
