use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{DedupKey, NewWeatherRecord, RecordFilter, RecordOrder, WeatherRecord};
use super::WeatherStore;
use crate::errors::AppError;
use crate::helpers::day_bounds;

const RECORD_COLUMNS: &str = "id, city, country, latitude, longitude, date,
    temperature, precipitation, wind_speed, weathercode, humidity,
    sunrise, sunset, hourly_data, daily_forecast, updated_at";

/// Shared predicate for list and count, so both see the same rows.
/// $1 = lower-cased city substring, $2/$3 = day window, $4 = country.
const FILTER_CLAUSE: &str = "($1::text IS NULL OR strpos(LOWER(city), $1) > 0)
    AND ($2::timestamp IS NULL OR (date >= $2 AND date < $3))
    AND ($4::text IS NULL OR country = $4)";

/// Postgres-backed record store.
#[derive(Debug, Clone)]
pub struct PgWeatherStore {
    pool: PgPool,
}

impl PgWeatherStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeatherStore for PgWeatherStore {
    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    async fn insert(&self, record: &NewWeatherRecord) -> Result<WeatherRecord, AppError> {
        let sql = format!(
            "INSERT INTO weather_records (
                id, city, country, latitude, longitude, date,
                temperature, precipitation, wind_speed, weathercode, humidity,
                sunrise, sunset, hourly_data, daily_forecast, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16
            )
            RETURNING {RECORD_COLUMNS}"
        );

        let row = sqlx::query_as::<_, WeatherRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&record.city)
            .bind(&record.country)
            .bind(record.latitude)
            .bind(record.longitude)
            .bind(record.date)
            .bind(record.temperature)
            .bind(record.precipitation)
            .bind(record.wind_speed)
            .bind(record.weathercode)
            .bind(record.humidity)
            .bind(record.sunrise)
            .bind(record.sunset)
            .bind(record.hourly_data.as_ref().map(Json))
            .bind(&record.daily_forecast)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn replace(
        &self,
        id: Uuid,
        record: &NewWeatherRecord,
    ) -> Result<Option<WeatherRecord>, AppError> {
        let sql = format!(
            "UPDATE weather_records SET
                city = $2, country = $3, latitude = $4, longitude = $5, date = $6,
                temperature = $7, precipitation = $8, wind_speed = $9,
                weathercode = $10, humidity = $11, sunrise = $12, sunset = $13,
                hourly_data = $14, daily_forecast = $15, updated_at = $16
             WHERE id = $1
             RETURNING {RECORD_COLUMNS}"
        );

        let row = sqlx::query_as::<_, WeatherRecord>(&sql)
            .bind(id)
            .bind(&record.city)
            .bind(&record.country)
            .bind(record.latitude)
            .bind(record.longitude)
            .bind(record.date)
            .bind(record.temperature)
            .bind(record.precipitation)
            .bind(record.wind_speed)
            .bind(record.weathercode)
            .bind(record.humidity)
            .bind(record.sunrise)
            .bind(record.sunset)
            .bind(record.hourly_data.as_ref().map(Json))
            .bind(&record.daily_forecast)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM weather_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WeatherRecord>, AppError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM weather_records WHERE id = $1");
        let row = sqlx::query_as::<_, WeatherRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_key(&self, key: &DedupKey) -> Result<Option<WeatherRecord>, AppError> {
        let (start, end) = day_bounds(key.day);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM weather_records
             WHERE city = $1 AND country = $2 AND date >= $3 AND date < $4
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, WeatherRecord>(&sql)
            .bind(&key.city)
            .bind(&key.country)
            .bind(start)
            .bind(end)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WeatherRecord>, AppError> {
        let window = filter.day_window();
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM weather_records
             WHERE {FILTER_CLAUSE}
             ORDER BY {}
             LIMIT $5 OFFSET $6",
            order.as_sql()
        );
        let rows = sqlx::query_as::<_, WeatherRecord>(&sql)
            .bind(filter.text.as_deref())
            .bind(window.map(|(start, _)| start))
            .bind(window.map(|(_, end)| end))
            .bind(filter.country.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self, filter: &RecordFilter) -> Result<i64, AppError> {
        let window = filter.day_window();
        let sql = format!("SELECT COUNT(*) FROM weather_records WHERE {FILTER_CLAUSE}");
        let total = sqlx::query_scalar::<_, i64>(&sql)
            .bind(filter.text.as_deref())
            .bind(window.map(|(start, _)| start))
            .bind(window.map(|(_, end)| end))
            .bind(filter.country.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
