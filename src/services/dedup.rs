//! Application-level duplicate check for the (city, country, day) key.
//!
//! This is the fast path with a useful error message. The store's unique
//! constraint remains authoritative: a write that races past this check is
//! rejected there and reported as the same `DuplicateRecord`.

use uuid::Uuid;

use crate::db::models::{DedupKey, WeatherRecord};
use crate::db::WeatherStore;
use crate::errors::AppError;

/// What the caller is about to do with the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteIntent {
    Create,
    /// Updating the record with this id; matching itself is not a conflict.
    Update(Uuid),
    /// Fetch-or-create: an existing record short-circuits the write.
    FetchOrCreate,
}

#[derive(Debug, Clone)]
pub enum DedupOutcome {
    /// No conflicting record; the write may proceed.
    Clear,
    /// Fetch-or-create only: return this record instead of writing.
    Exists(WeatherRecord),
}

pub async fn check_and_reserve(
    store: &dyn WeatherStore,
    key: &DedupKey,
    intent: WriteIntent,
) -> Result<DedupOutcome, AppError> {
    let Some(existing) = store.find_by_key(key).await? else {
        return Ok(DedupOutcome::Clear);
    };

    match intent {
        WriteIntent::FetchOrCreate => {
            tracing::debug!(
                "Record {} already covers {}/{}/{}",
                existing.id,
                key.city,
                key.country,
                key.day
            );
            Ok(DedupOutcome::Exists(existing))
        }
        WriteIntent::Update(id) if existing.id == id => Ok(DedupOutcome::Clear),
        WriteIntent::Create | WriteIntent::Update(_) => {
            tracing::info!(
                "Rejecting duplicate for {}/{}/{} (existing {})",
                key.city,
                key.country,
                key.day,
                existing.id
            );
            Err(AppError::DuplicateRecord {
                existing_id: Some(existing.id),
            })
        }
    }
}
