//! Reductions over raw hourly series.
//!
//! Series entries are `Option<f64>`: `None` marks an hour the provider had
//! no value for and is skipped by every reduction.
//!
//! Two empty-input policies coexist:
//! - summary stats (temperature average, precipitation, wind) use `mean`,
//!   which yields `0.0` for an empty series;
//! - derived humidity uses `mean_or_none`, which yields `None`.
//!
//! Neither is an error; the pipeline carries on with the default.

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

/// Number of leading hours used by the hour-pick fallback.
const FIRST_DAY_HOURS: usize = 24;

/// Arithmetic mean of the present values, `0.0` when there are none.
pub fn mean(series: &[Option<f64>]) -> f64 {
    mean_or_none(series).unwrap_or(0.0)
}

/// Arithmetic mean of the present values, `None` when there are none.
pub fn mean_or_none(series: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = series
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return None;
    }
    Some(sum / count as f64)
}

/// Pick `series[hour]`, falling back to the mean of the first 24 entries
/// when that slot is missing or null. `None` only when nothing is present.
pub fn at_hour_offset(series: &[Option<f64>], hour: usize) -> Option<f64> {
    series
        .get(hour)
        .copied()
        .flatten()
        .or_else(|| mean_or_none(&series[..series.len().min(FIRST_DAY_HOURS)]))
}

/// Which semantics the representative temperature carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureKind {
    /// Provider's instantaneous reading; only for today's date.
    Current,
    /// Mean of the hourly series over the fetched window.
    Average,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedTemperature {
    pub value: f64,
    pub kind: TemperatureKind,
}

/// Choose between the live reading and the window average.
pub fn select_temperature(
    requested: NaiveDate,
    today: NaiveDate,
    live_reading: Option<f64>,
    hourly_temperatures: &[Option<f64>],
) -> SelectedTemperature {
    match live_reading {
        Some(value) if requested == today => SelectedTemperature {
            value,
            kind: TemperatureKind::Current,
        },
        _ => SelectedTemperature {
            value: mean(hourly_temperatures),
            kind: TemperatureKind::Average,
        },
    }
}
