//! Ingestion pipeline: resolve → fetch → aggregate/normalize → dedup → persist.
//!
//! Every step runs sequentially within one request. Nothing is written until
//! the normalized record is fully built, so an abandoned request never
//! leaves a partial row behind.

use chrono::NaiveDateTime;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::db::models::{DedupKey, WeatherRecord};
use crate::db::WeatherStore;
use crate::errors::AppError;
use crate::helpers::parse_datetime;
use crate::services::aggregate::TemperatureKind;
use crate::services::dedup::{check_and_reserve, DedupOutcome, WriteIntent};
use crate::services::geocoding::GeocodingClient;
use crate::services::normalize::{normalize, WeatherSnapshot};
use crate::services::open_meteo::ForecastClient;
use crate::services::records::normalize_country;

/// Body of the preview and fetch-or-create requests.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FetchRequest {
    pub city: Option<String>,
    /// Country hint (preview) or required country code (fetch-or-create)
    pub country: Option<String>,
    /// Target date, `YYYY-MM-DD`
    pub date: Option<String>,
}

/// The two external providers, bundled for the write path.
#[derive(Debug, Clone)]
pub struct Providers {
    pub geocoder: GeocodingClient,
    pub forecasts: ForecastClient,
}

/// Outcome of fetch-or-create.
#[derive(Debug, Clone)]
pub enum FetchOrCreate {
    /// A record already covered the key; no provider call or write happened.
    Exists(WeatherRecord),
    Created {
        record: WeatherRecord,
        temperature_kind: TemperatureKind,
    },
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::ValidationFailed(format!("Missing parameter: {}", name)))
}

fn parse_target_date(raw: &str) -> Result<NaiveDateTime, AppError> {
    parse_datetime(raw).ok_or_else(|| AppError::ValidationFailed(format!("Invalid date: {}", raw)))
}

async fn resolve_and_normalize(
    providers: &Providers,
    city: &str,
    country_hint: Option<&str>,
    date: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<WeatherSnapshot, AppError> {
    let location = providers.geocoder.resolve(city, country_hint).await?;
    let raw = providers
        .forecasts
        .fetch(location.latitude, location.longitude, date.date())
        .await?;
    Ok(normalize(city, country_hint, date, &location, raw, now))
}

/// Resolve and fetch without persisting anything.
pub async fn preview(
    providers: &Providers,
    request: &FetchRequest,
    now: NaiveDateTime,
) -> Result<WeatherSnapshot, AppError> {
    let city = required(&request.city, "city")?;
    let date = parse_target_date(required(&request.date, "date")?)?;
    let country_hint = request
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    resolve_and_normalize(providers, city, country_hint, date, now).await
}

/// Return the stored record for (city, country, day), or build and store one.
pub async fn fetch_or_create(
    store: &dyn WeatherStore,
    providers: &Providers,
    request: &FetchRequest,
    now: NaiveDateTime,
) -> Result<FetchOrCreate, AppError> {
    let city = required(&request.city, "city")?;
    let country = normalize_country(required(&request.country, "country")?)?;
    let date = parse_target_date(required(&request.date, "date")?)?;

    let key = DedupKey {
        city: city.to_string(),
        country: country.clone(),
        day: date.date(),
    };

    if let DedupOutcome::Exists(existing) =
        check_and_reserve(store, &key, WriteIntent::FetchOrCreate).await?
    {
        return Ok(FetchOrCreate::Exists(existing));
    }

    let snapshot = resolve_and_normalize(providers, city, Some(country.as_str()), date, now).await?;
    let temperature_kind = snapshot.temperature_kind;
    let record = snapshot.into_new_record(country);

    match store.insert(&record).await {
        Ok(stored) => {
            tracing::info!(
                "Live-fetched weather entry {} for {}/{} on {} ({:?})",
                stored.id,
                stored.city,
                stored.country,
                stored.date.date(),
                temperature_kind
            );
            Ok(FetchOrCreate::Created {
                record: stored,
                temperature_kind,
            })
        }
        Err(AppError::DuplicateRecord { existing_id }) => {
            // Lost a race with a concurrent writer; serve the winner.
            tracing::info!(
                "Concurrent write for {}/{}/{}, returning existing record",
                key.city,
                key.country,
                key.day
            );
            match store.find_by_key(&key).await? {
                Some(existing) => Ok(FetchOrCreate::Exists(existing)),
                None => Err(AppError::DuplicateRecord { existing_id }),
            }
        }
        Err(e) => Err(e),
    }
}
