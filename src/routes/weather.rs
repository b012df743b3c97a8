use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::AppState;
use crate::db::models::{HourlyData, WeatherRecord};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{format_datetime, opt_format_datetime};
use crate::services::aggregate::TemperatureKind;
use crate::services::normalize::WeatherSnapshot;
use crate::services::pipeline::{self, FetchOrCreate, FetchRequest};
use crate::services::query::{self, ListParams};
use crate::services::records::{self, WeatherInput};

/// Full weather record, as returned by GET /api/weather/{id}.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherResponse {
    /// Unique record identifier
    pub id: Uuid,
    pub city: String,
    /// ISO 3166-1 alpha-2 country code
    pub country: String,
    /// Latitude (WGS84)
    pub latitude: f64,
    /// Longitude (WGS84)
    pub longitude: f64,
    /// Observation date, `YYYY-MM-DDTHH:MM:SS`
    pub date: String,
    /// Temperature in °C
    pub temperature: f64,
    /// Precipitation in mm
    pub precipitation: f64,
    /// Wind speed in km/h
    #[serde(rename = "windSpeed")]
    pub wind_speed: f64,
    /// WMO weather code
    pub weathercode: Option<i32>,
    /// Mean relative humidity in %
    pub humidity: Option<f64>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub hourly_data: Option<HourlyData>,
    #[schema(value_type = Option<Object>)]
    pub daily_forecast: Option<serde_json::Value>,
    /// Last write time in RFC 3339 format
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<WeatherRecord> for WeatherResponse {
    fn from(r: WeatherRecord) -> Self {
        Self {
            id: r.id,
            city: r.city,
            country: r.country,
            latitude: r.latitude,
            longitude: r.longitude,
            date: format_datetime(r.date),
            temperature: r.temperature,
            precipitation: r.precipitation,
            wind_speed: r.wind_speed,
            weathercode: r.weathercode,
            humidity: r.humidity,
            sunrise: opt_format_datetime(r.sunrise),
            sunset: opt_format_datetime(r.sunset),
            hourly_data: r.hourly_data.map(|json| json.0),
            daily_forecast: r.daily_forecast,
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

/// Summary row for GET /api/weather (no hourly or daily series).
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherListItem {
    pub id: Uuid,
    pub city: String,
    pub country: String,
    pub date: String,
    pub temperature: f64,
    pub precipitation: f64,
    #[serde(rename = "windSpeed")]
    pub wind_speed: f64,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<WeatherRecord> for WeatherListItem {
    fn from(r: WeatherRecord) -> Self {
        Self {
            id: r.id,
            city: r.city,
            country: r.country,
            date: format_datetime(r.date),
            temperature: r.temperature,
            precipitation: r.precipitation,
            wind_speed: r.wind_speed,
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherListResponse {
    pub data: Vec<WeatherListItem>,
    /// Number of records matching the filters, across all pages
    pub total: i64,
    pub page: i64,
    #[serde(rename = "perPage")]
    pub per_page: i64,
}

/// Query parameters for GET /api/weather. Empty values are ignored.
#[derive(Debug, Deserialize, IntoParams)]
pub struct WeatherListQuery {
    /// 1-based page number; values below 1 are treated as 1
    pub page: Option<String>,
    /// Case-insensitive city substring
    pub q: Option<String>,
    /// Calendar day, `YYYY-MM-DD`
    pub date: Option<String>,
    /// Country code
    pub country: Option<String>,
    /// `updated_desc` (default), `updated_asc`, `date_desc` or `date_asc`
    pub order: Option<String>,
}

impl From<WeatherListQuery> for ListParams {
    fn from(q: WeatherListQuery) -> Self {
        Self {
            page: q.page,
            q: q.q,
            date: q.date,
            country: q.country,
            order: q.order,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    /// Always "created"
    pub status: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdatedResponse {
    /// Always "updated"
    pub status: String,
}

/// Normalized weather for POST /api/weather/fetch. Nothing is stored.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherPreview {
    pub city: String,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    pub temperature: f64,
    /// Whether `temperature` is the live reading or the hourly average
    #[serde(rename = "temperatureType")]
    pub temperature_type: TemperatureKind,
    pub precipitation: f64,
    #[serde(rename = "windSpeed")]
    pub wind_speed: f64,
    pub weathercode: i32,
    pub humidity: Option<f64>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub hourly_data: HourlyData,
    /// Daily block from the forecast provider, unchanged
    #[schema(value_type = Option<Object>)]
    pub daily: Option<serde_json::Value>,
}

impl From<WeatherSnapshot> for WeatherPreview {
    fn from(s: WeatherSnapshot) -> Self {
        Self {
            city: s.city,
            country: s.country,
            latitude: s.latitude,
            longitude: s.longitude,
            date: format_datetime(s.date),
            temperature: s.temperature,
            temperature_type: s.temperature_kind,
            precipitation: s.precipitation,
            wind_speed: s.wind_speed,
            weathercode: s.weathercode,
            humidity: s.humidity,
            sunrise: opt_format_datetime(s.sunrise),
            sunset: opt_format_datetime(s.sunset),
            hourly_data: s.hourly_data,
            daily: s.daily,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LiveFetchResponse {
    /// "exists" or "created"
    pub status: String,
    /// Present only when a record was created
    #[serde(rename = "temperatureType", skip_serializing_if = "Option::is_none")]
    pub temperature_type: Option<TemperatureKind>,
    pub weather: WeatherResponse,
}

fn live_fetch_reply(outcome: FetchOrCreate) -> (StatusCode, LiveFetchResponse) {
    match outcome {
        FetchOrCreate::Exists(record) => (
            StatusCode::OK,
            LiveFetchResponse {
                status: "exists".to_string(),
                temperature_type: None,
                weather: record.into(),
            },
        ),
        FetchOrCreate::Created {
            record,
            temperature_kind,
        } => (
            StatusCode::CREATED,
            LiveFetchResponse {
                status: "created".to_string(),
                temperature_type: Some(temperature_kind),
                weather: record.into(),
            },
        ),
    }
}

/// List stored records, filtered and paginated.
#[utoipa::path(
    get,
    path = "/api/weather",
    tag = "Weather",
    params(WeatherListQuery),
    responses(
        (status = 200, description = "One page of matching records", body = WeatherListResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
    )
)]
pub(crate) async fn list_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherListQuery>,
) -> Result<Json<WeatherListResponse>, AppError> {
    let result = query::query_records(state.store.as_ref(), &params.into()).await?;
    Ok(Json(WeatherListResponse {
        data: result.items.into_iter().map(WeatherListItem::from).collect(),
        total: result.total,
        page: result.page,
        per_page: result.per_page,
    }))
}

/// Get one record with its hourly and daily series.
#[utoipa::path(
    get,
    path = "/api/weather/{id}",
    tag = "Weather",
    params(
        ("id" = Uuid, Path, description = "Record UUID"),
    ),
    responses(
        (status = 200, description = "The record", body = WeatherResponse),
        (status = 404, description = "Record not found", body = ErrorResponse),
    )
)]
pub(crate) async fn get_weather(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<WeatherResponse>, AppError> {
    let Path(id) = path?;
    let record = records::get_record(state.store.as_ref(), id).await?;
    Ok(Json(record.into()))
}

/// Store a client-supplied record.
#[utoipa::path(
    post,
    path = "/api/weather",
    tag = "Weather",
    request_body = WeatherInput,
    responses(
        (status = 201, description = "Record created", body = CreatedResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 409, description = "A record already exists for this city, country and day", body = ErrorResponse),
    )
)]
pub(crate) async fn create_weather(
    State(state): State<AppState>,
    payload: Result<Json<WeatherInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let Json(input) = payload?;
    let stored = records::create_record(state.store.as_ref(), input).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            status: "created".to_string(),
            id: stored.id,
        }),
    ))
}

/// Replace all mutable fields of a record.
#[utoipa::path(
    put,
    path = "/api/weather/{id}",
    tag = "Weather",
    params(
        ("id" = Uuid, Path, description = "Record UUID"),
    ),
    request_body = WeatherInput,
    responses(
        (status = 200, description = "Record updated", body = UpdatedResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse),
        (status = 409, description = "Another record already holds this city, country and day", body = ErrorResponse),
    )
)]
pub(crate) async fn update_weather(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<WeatherInput>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, AppError> {
    let Path(id) = path?;
    let Json(input) = payload?;
    records::update_record(state.store.as_ref(), id, input).await?;
    Ok(Json(UpdatedResponse {
        status: "updated".to_string(),
    }))
}

/// Delete a record.
#[utoipa::path(
    delete,
    path = "/api/weather/{id}",
    tag = "Weather",
    params(
        ("id" = Uuid, Path, description = "Record UUID"),
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found", body = ErrorResponse),
    )
)]
pub(crate) async fn delete_weather(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    records::delete_record(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve the city and fetch its forecast without storing anything.
#[utoipa::path(
    post,
    path = "/api/weather/fetch",
    tag = "Weather",
    request_body = FetchRequest,
    responses(
        (status = 200, description = "Normalized weather", body = WeatherPreview),
        (status = 400, description = "Missing or invalid parameters", body = ErrorResponse),
        (status = 404, description = "City not found or no forecast data", body = ErrorResponse),
    )
)]
pub(crate) async fn preview_weather(
    State(state): State<AppState>,
    payload: Result<Json<FetchRequest>, JsonRejection>,
) -> Result<Json<WeatherPreview>, AppError> {
    let Json(request) = payload?;
    let now = Local::now().naive_local();
    let snapshot = pipeline::preview(&state.providers, &request, now).await?;
    Ok(Json(snapshot.into()))
}

/// Return the stored record for the city, country and day, fetching and
/// storing it first if none exists.
#[utoipa::path(
    post,
    path = "/api/weather/live-fetch",
    tag = "Weather",
    request_body = FetchRequest,
    responses(
        (status = 200, description = "Record already existed", body = LiveFetchResponse),
        (status = 201, description = "Record fetched and stored", body = LiveFetchResponse),
        (status = 400, description = "Missing or invalid parameters", body = ErrorResponse),
        (status = 404, description = "City not found or no forecast data", body = ErrorResponse),
    )
)]
pub(crate) async fn live_fetch_weather(
    State(state): State<AppState>,
    payload: Result<Json<FetchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LiveFetchResponse>), AppError> {
    let Json(request) = payload?;
    let now = Local::now().naive_local();
    let outcome =
        pipeline::fetch_or_create(state.store.as_ref(), &state.providers, &request, now).await?;
    let (status, body) = live_fetch_reply(outcome);
    Ok((status, Json(body)))
}
