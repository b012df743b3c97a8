//! Record storage.
//!
//! `WeatherStore` is the seam between the services and persistence. The
//! Postgres implementation lives in `queries`; uniqueness of
//! (city, country, day) is enforced by every implementation on write and
//! surfaces as `AppError::DuplicateRecord`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use models::{DedupKey, NewWeatherRecord, RecordFilter, RecordOrder, WeatherRecord};

#[cfg(test)]
pub mod memory;
pub mod models;
pub mod queries;

#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> bool;

    async fn insert(&self, record: &NewWeatherRecord) -> Result<WeatherRecord, AppError>;

    /// Replace every mutable field of `id`. `Ok(None)` when `id` does not exist.
    async fn replace(
        &self,
        id: Uuid,
        record: &NewWeatherRecord,
    ) -> Result<Option<WeatherRecord>, AppError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<WeatherRecord>, AppError>;

    async fn find_by_key(&self, key: &DedupKey) -> Result<Option<WeatherRecord>, AppError>;

    async fn list(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WeatherRecord>, AppError>;

    async fn count(&self, filter: &RecordFilter) -> Result<i64, AppError>;
}
