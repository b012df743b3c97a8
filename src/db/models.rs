use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::helpers::day_bounds;

/// Hourly series as returned by Open-Meteo under `hourly`.
///
/// Every series is indexed by the same implicit hour offset as `time`.
/// Missing keys deserialize to empty vectors; hours the provider has no
/// value for stay in place as `null` so offsets remain aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HourlyData {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    /// WMO codes, integers as sent by the provider
    pub weathercode: Vec<Option<i32>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
}

impl HourlyData {
    /// Lengths of the series that are present (non-empty).
    fn present_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        [
            self.time.len(),
            self.temperature_2m.len(),
            self.precipitation.len(),
            self.weathercode.len(),
            self.wind_speed_10m.len(),
            self.relative_humidity_2m.len(),
        ]
        .into_iter()
        .filter(|&len| len > 0)
    }

    /// True when all present series have the same length.
    pub fn is_aligned(&self) -> bool {
        let mut lengths = self.present_lengths();
        match lengths.next() {
            Some(first) => lengths.all(|len| len == first),
            None => true,
        }
    }
}

/// The uniqueness key: (city, country, calendar day).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub city: String,
    pub country: String,
    pub day: NaiveDate,
}

/// Canonical persisted weather record.
#[derive(Debug, Clone, FromRow)]
pub struct WeatherRecord {
    pub id: Uuid,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDateTime,
    pub temperature: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub weathercode: Option<i32>,
    pub humidity: Option<f64>,
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
    pub hourly_data: Option<Json<HourlyData>>,
    pub daily_forecast: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl WeatherRecord {
    pub fn key(&self) -> DedupKey {
        DedupKey {
            city: self.city.clone(),
            country: self.country.clone(),
            day: self.date.date(),
        }
    }
}

/// A fully-validated record value without identity.
///
/// Creates and updates both build a fresh `NewWeatherRecord` and hand it to
/// the store; stored records are never mutated field by field.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWeatherRecord {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDateTime,
    pub temperature: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub weathercode: Option<i32>,
    pub humidity: Option<f64>,
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
    pub hourly_data: Option<HourlyData>,
    pub daily_forecast: Option<serde_json::Value>,
}

impl NewWeatherRecord {
    pub fn key(&self) -> DedupKey {
        DedupKey {
            city: self.city.clone(),
            country: self.country.clone(),
            day: self.date.date(),
        }
    }

    /// Materialize into a stored record with the given identity.
    pub fn into_record(self, id: Uuid, updated_at: DateTime<Utc>) -> WeatherRecord {
        WeatherRecord {
            id,
            city: self.city,
            country: self.country,
            latitude: self.latitude,
            longitude: self.longitude,
            date: self.date,
            temperature: self.temperature,
            precipitation: self.precipitation,
            wind_speed: self.wind_speed,
            weathercode: self.weathercode,
            humidity: self.humidity,
            sunrise: self.sunrise,
            sunset: self.sunset,
            hourly_data: self.hourly_data.map(Json),
            daily_forecast: self.daily_forecast,
            updated_at,
        }
    }
}

/// Read-side ordering. Unknown names fall back to `UpdatedDesc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordOrder {
    #[default]
    UpdatedDesc,
    UpdatedAsc,
    DateDesc,
    DateAsc,
}

impl RecordOrder {
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("updated_asc") => RecordOrder::UpdatedAsc,
            Some("date_desc") => RecordOrder::DateDesc,
            Some("date_asc") => RecordOrder::DateAsc,
            _ => RecordOrder::UpdatedDesc,
        }
    }

    /// SQL `ORDER BY` body. `id` breaks ties so pages stay disjoint.
    pub fn as_sql(self) -> &'static str {
        match self {
            RecordOrder::UpdatedDesc => "updated_at DESC, id",
            RecordOrder::UpdatedAsc => "updated_at ASC, id",
            RecordOrder::DateDesc => "date DESC, id",
            RecordOrder::DateAsc => "date ASC, id",
        }
    }
}

/// Conjunctive read filter. `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Lower-cased substring matched against `city`.
    pub text: Option<String>,
    pub day: Option<NaiveDate>,
    pub country: Option<String>,
}

impl RecordFilter {
    pub fn day_window(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.day.map(day_bounds)
    }

    pub fn matches(&self, record: &WeatherRecord) -> bool {
        if let Some(text) = &self.text {
            if !record.city.to_lowercase().contains(text.as_str()) {
                return false;
            }
        }
        if let Some((start, end)) = self.day_window() {
            if record.date < start || record.date >= end {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if &record.country != country {
                return false;
            }
        }
        true
    }
}
