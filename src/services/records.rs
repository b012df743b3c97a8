//! Record create/read/update/delete with validation.
//!
//! Updates are full replacements: the payload is validated into a fresh
//! `NewWeatherRecord` and swapped in for the stored value.

use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::{DedupKey, HourlyData, NewWeatherRecord, WeatherRecord};
use crate::db::WeatherStore;
use crate::errors::AppError;
use crate::helpers::parse_datetime;
use crate::services::dedup::{check_and_reserve, WriteIntent};
use crate::services::normalize::derive_humidity;

/// Client-supplied record fields (create and full update).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WeatherInput {
    pub city: String,
    /// ISO 3166-1 alpha-2 country code
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Date (`YYYY-MM-DD`) or date-time (`YYYY-MM-DDTHH:MM:SS`)
    pub date: String,
    pub temperature: f64,
    pub precipitation: f64,
    #[serde(rename = "windSpeed")]
    pub wind_speed: f64,
    #[serde(default)]
    pub weathercode: Option<i32>,
    #[serde(default)]
    pub sunrise: Option<String>,
    #[serde(default)]
    pub sunset: Option<String>,
    #[serde(default)]
    pub hourly_data: Option<HourlyData>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub daily_forecast: Option<serde_json::Value>,
}

/// Trim and upper-case a country code, requiring two ASCII letters.
pub fn normalize_country(raw: &str) -> Result<String, AppError> {
    let code = raw.trim().to_uppercase();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::ValidationFailed(format!(
            "country must be a 2-letter code, got '{}'",
            raw
        )));
    }
    Ok(code)
}

fn optional_timestamp(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<chrono::NaiveDateTime>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse_datetime(value)
            .map(Some)
            .ok_or_else(|| AppError::ValidationFailed(format!("Invalid {}: {}", field, value))),
        None => Ok(None),
    }
}

fn require_finite(field: &str, value: f64) -> Result<f64, AppError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AppError::ValidationFailed(format!(
            "{} must be a finite number",
            field
        )))
    }
}

impl WeatherInput {
    /// Validate and build the record value. Humidity is derived from the
    /// relative-humidity series, never taken from the client.
    pub fn into_record(self) -> Result<NewWeatherRecord, AppError> {
        let city = self.city.trim().to_string();
        if city.is_empty() {
            return Err(AppError::ValidationFailed("city is required".to_string()));
        }
        let country = normalize_country(&self.country)?;

        let latitude = require_finite("latitude", self.latitude)?;
        let longitude = require_finite("longitude", self.longitude)?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::ValidationFailed(format!(
                "latitude {} out of range [-90, 90]",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::ValidationFailed(format!(
                "longitude {} out of range [-180, 180]",
                longitude
            )));
        }

        let date = parse_datetime(&self.date)
            .ok_or_else(|| AppError::ValidationFailed(format!("Invalid date: {}", self.date)))?;

        if let Some(hourly) = &self.hourly_data {
            if !hourly.is_aligned() {
                return Err(AppError::ValidationFailed(
                    "hourly_data series must have equal lengths".to_string(),
                ));
            }
        }

        Ok(NewWeatherRecord {
            city,
            country,
            latitude,
            longitude,
            date,
            temperature: require_finite("temperature", self.temperature)?,
            precipitation: require_finite("precipitation", self.precipitation)?,
            wind_speed: require_finite("windSpeed", self.wind_speed)?,
            weathercode: self.weathercode,
            humidity: derive_humidity(self.hourly_data.as_ref()),
            sunrise: optional_timestamp("sunrise", self.sunrise.as_deref())?,
            sunset: optional_timestamp("sunset", self.sunset.as_deref())?,
            hourly_data: self.hourly_data,
            daily_forecast: self.daily_forecast,
        })
    }
}

/// The unique index rejects a write without naming the row it collided
/// with. Look the holder of the key up so the conflict carries its id.
async fn identify_conflict(
    store: &dyn WeatherStore,
    key: &DedupKey,
    err: AppError,
) -> AppError {
    let AppError::DuplicateRecord { existing_id: None } = err else {
        return err;
    };
    match store.find_by_key(key).await {
        Ok(existing) => AppError::DuplicateRecord {
            existing_id: existing.map(|r| r.id),
        },
        Err(lookup_err) => {
            tracing::warn!(
                "Could not identify conflicting record for {}/{}/{}: {}",
                key.city,
                key.country,
                key.day,
                lookup_err
            );
            err
        }
    }
}

pub async fn get_record(store: &dyn WeatherStore, id: Uuid) -> Result<WeatherRecord, AppError> {
    store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Weather entry {} not found", id)))
}

pub async fn create_record(
    store: &dyn WeatherStore,
    input: WeatherInput,
) -> Result<WeatherRecord, AppError> {
    let record = input.into_record()?;
    let key = record.key();
    check_and_reserve(store, &key, WriteIntent::Create).await?;

    let stored = match store.insert(&record).await {
        Ok(stored) => stored,
        Err(e) => return Err(identify_conflict(store, &key, e).await),
    };
    tracing::info!(
        "Created weather entry {} for {}/{} on {}",
        stored.id,
        stored.city,
        stored.country,
        stored.date.date()
    );
    Ok(stored)
}

pub async fn update_record(
    store: &dyn WeatherStore,
    id: Uuid,
    input: WeatherInput,
) -> Result<WeatherRecord, AppError> {
    let record = input.into_record()?;
    let key = record.key();
    // 404 takes precedence over a key conflict.
    get_record(store, id).await?;
    check_and_reserve(store, &key, WriteIntent::Update(id)).await?;

    let replaced = match store.replace(id, &record).await {
        Ok(replaced) => replaced,
        Err(e) => return Err(identify_conflict(store, &key, e).await),
    };
    let updated = replaced
        .ok_or_else(|| AppError::NotFound(format!("Weather entry {} not found", id)))?;
    tracing::info!("Updated weather entry {}", id);
    Ok(updated)
}

pub async fn delete_record(store: &dyn WeatherStore, id: Uuid) -> Result<(), AppError> {
    if !store.delete(id).await? {
        return Err(AppError::NotFound(format!("Weather entry {} not found", id)));
    }
    tracing::info!("Deleted weather entry {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    fn paris_input() -> WeatherInput {
        serde_json::from_value(serde_json::json!({
            "city": "Paris",
            "country": "FR",
            "latitude": 48.8566,
            "longitude": 2.3522,
            "date": "2025-05-09",
            "temperature": 22.5,
            "precipitation": 0.0,
            "windSpeed": 3.4,
            "weathercode": 1,
            "sunrise": "2025-05-09T06:12:00",
            "sunset": null,
            "hourly_data": {
                "time": ["2025-05-09T00:00", "2025-05-09T01:00"],
                "relative_humidity_2m": [60.0, 70.0]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_into_record_derives_humidity() {
        let record = paris_input().into_record().unwrap();
        assert_eq!(record.humidity, Some(65.0));
        assert_eq!(record.wind_speed, 3.4);
        assert!(record.sunrise.is_some());
        assert_eq!(record.sunset, None);
    }

    #[test]
    fn test_into_record_without_hourly_has_no_humidity() {
        let mut input = paris_input();
        input.hourly_data = None;
        assert_eq!(input.into_record().unwrap().humidity, None);
    }

    #[test]
    fn test_into_record_rejects_bad_coordinates() {
        let mut input = paris_input();
        input.latitude = 91.0;
        assert!(matches!(
            input.into_record(),
            Err(AppError::ValidationFailed(_))
        ));

        let mut input = paris_input();
        input.longitude = -180.5;
        assert!(matches!(
            input.into_record(),
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_into_record_rejects_bad_country_and_date() {
        let mut input = paris_input();
        input.country = "FRA".to_string();
        assert!(input.into_record().is_err());

        let mut input = paris_input();
        input.date = "tomorrow".to_string();
        assert!(input.into_record().is_err());
    }

    #[test]
    fn test_into_record_rejects_ragged_hourly() {
        let mut input = paris_input();
        input.hourly_data = Some(HourlyData {
            time: vec!["2025-05-09T00:00".into()],
            temperature_2m: vec![Some(1.0), Some(2.0)],
            ..Default::default()
        });
        assert!(matches!(
            input.into_record(),
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_normalize_country() {
        assert_eq!(normalize_country(" fr ").unwrap(), "FR");
        assert!(normalize_country("F1").is_err());
        assert!(normalize_country("").is_err());
    }

    #[test]
    fn test_missing_required_field_fails_to_deserialize() {
        let parsed: Result<WeatherInput, _> = serde_json::from_value(serde_json::json!({
            "city": "Paris",
            "country": "FR"
        }));
        assert!(parsed.is_err());
    }

    /// Create, duplicate create, update, get, delete, get.
    #[tokio::test]
    async fn test_record_lifecycle() {
        let store = MemoryStore::new();

        let created = create_record(&store, paris_input()).await.unwrap();

        let err = create_record(&store, paris_input()).await.unwrap_err();
        match err {
            AppError::DuplicateRecord { existing_id } => {
                assert_eq!(existing_id, Some(created.id))
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.len().await, 1);

        let mut input = paris_input();
        input.temperature = 26.0;
        let updated = update_record(&store, created.id, input).await.unwrap();
        assert_eq!(updated.id, created.id);

        let fetched = get_record(&store, created.id).await.unwrap();
        assert_eq!(fetched.temperature, 26.0);
        assert!(fetched.updated_at >= created.updated_at);

        tokio_test::assert_ok!(delete_record(&store, created.id).await);
        let err = get_record(&store, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_onto_existing_key_conflicts() {
        let store = MemoryStore::new();
        let paris = create_record(&store, paris_input()).await.unwrap();

        let mut lyon = paris_input();
        lyon.city = "Lyon".to_string();
        let lyon = create_record(&store, lyon).await.unwrap();

        let err = update_record(&store, lyon.id, paris_input()).await.unwrap_err();
        match err {
            AppError::DuplicateRecord { existing_id } => assert_eq!(existing_id, Some(paris.id)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = update_record(&store, Uuid::new_v4(), paris_input())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = delete_record(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_racing_create_is_rejected_by_store() {
        let store = MemoryStore::new();
        let first = create_record(&store, paris_input()).await.unwrap();

        // The pre-check misses the committed row; the store's constraint catches it.
        store.blind_next_lookups(1);
        let err = create_record(&store, paris_input()).await.unwrap_err();
        match err {
            AppError::DuplicateRecord { existing_id } => assert_eq!(existing_id, Some(first.id)),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_racing_update_reports_conflicting_id() {
        let store = MemoryStore::new();
        let paris = create_record(&store, paris_input()).await.unwrap();

        let mut lyon = paris_input();
        lyon.city = "Lyon".to_string();
        let lyon = create_record(&store, lyon).await.unwrap();

        store.blind_next_lookups(1);
        let err = update_record(&store, lyon.id, paris_input())
            .await
            .unwrap_err();
        match err {
            AppError::DuplicateRecord { existing_id } => assert_eq!(existing_id, Some(paris.id)),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(get_record(&store, lyon.id).await.unwrap().city, "Lyon");
    }
}
