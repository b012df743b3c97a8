//! In-memory `WeatherStore` for tests.
//!
//! Enforces the same (city, country, day) uniqueness rule as the Postgres
//! unique index, so duplicate handling can be exercised without a database.
//! Like the index, a rejected write does not say which row it collided with.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{DedupKey, NewWeatherRecord, RecordFilter, RecordOrder, WeatherRecord};
use super::WeatherStore;
use crate::errors::AppError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<WeatherRecord>>,
    /// Number of upcoming `find_by_key` calls that report no match,
    /// simulating a concurrent writer that commits after the pre-check.
    blind_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blind_next_lookups(&self, n: usize) {
        self.blind_lookups.store(n, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    fn sort(rows: &mut [WeatherRecord], order: RecordOrder) {
        match order {
            RecordOrder::UpdatedDesc => {
                rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)))
            }
            RecordOrder::UpdatedAsc => {
                rows.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)))
            }
            RecordOrder::DateDesc => {
                rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)))
            }
            RecordOrder::DateAsc => rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id))),
        }
    }
}

#[async_trait]
impl WeatherStore for MemoryStore {
    async fn ping(&self) -> bool {
        true
    }

    async fn insert(&self, record: &NewWeatherRecord) -> Result<WeatherRecord, AppError> {
        let mut rows = self.rows.write().await;
        let key = record.key();
        if rows.iter().any(|r| r.key() == key) {
            return Err(AppError::DuplicateRecord { existing_id: None });
        }
        let stored = record.clone().into_record(Uuid::new_v4(), Utc::now());
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn replace(
        &self,
        id: Uuid,
        record: &NewWeatherRecord,
    ) -> Result<Option<WeatherRecord>, AppError> {
        let mut rows = self.rows.write().await;
        let key = record.key();
        if rows.iter().any(|r| r.id != id && r.key() == key) {
            return Err(AppError::DuplicateRecord { existing_id: None });
        }
        let Some(slot) = rows.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        *slot = record.clone().into_record(id, Utc::now());
        Ok(Some(slot.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() < before)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WeatherRecord>, AppError> {
        Ok(self.rows.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_key(&self, key: &DedupKey) -> Result<Option<WeatherRecord>, AppError> {
        let blinded = self
            .blind_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if blinded {
            return Ok(None);
        }
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|r| &r.key() == key)
            .cloned())
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WeatherRecord>, AppError> {
        let mut matching: Vec<WeatherRecord> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Self::sort(&mut matching, order);
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self, filter: &RecordFilter) -> Result<i64, AppError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| filter.matches(r)).count() as i64)
    }
}
