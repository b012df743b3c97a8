//! Open-Meteo forecast client.
//!
//! Fetches a fixed 7-day window of hourly and daily series plus the live
//! `current_weather` reading. Transport errors, non-success statuses,
//! malformed bodies and a missing `hourly.time` series all surface as
//! `AppError::ForecastUnavailable`.
//!
//! See: https://open-meteo.com/en/docs

use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::db::models::HourlyData;
use crate::errors::AppError;
use crate::helpers::parse_datetime;

const FORECAST_PATH: &str = "/v1/forecast";

/// Days after the start date included in the window (start + 6 = 7 days).
const WINDOW_EXTRA_DAYS: u64 = 6;

const HOURLY_VARIABLES: &str =
    "temperature_2m,precipitation,weathercode,wind_speed_10m,relative_humidity_2m";

const DAILY_VARIABLES: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum,\
    weathercode,wind_speed_10m_max,uv_index_max,sunrise,sunset";

/// Raw provider payload, kept close to the wire shape.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecast {
    #[serde(default)]
    pub hourly: HourlyData,
    /// Daily summaries, stored verbatim as `dailyForecast`.
    #[serde(default)]
    pub daily: Option<serde_json::Value>,
    #[serde(default)]
    pub current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub temperature: Option<f64>,
}

impl RawForecast {
    pub fn live_temperature(&self) -> Option<f64> {
        self.current_weather.as_ref().and_then(|c| c.temperature)
    }

    /// First entry of a daily timestamp series (e.g. `sunrise`), if parseable.
    pub fn first_daily_timestamp(&self, series: &str) -> Option<NaiveDateTime> {
        self.daily
            .as_ref()?
            .get(series)?
            .get(0)?
            .as_str()
            .and_then(parse_datetime)
    }
}

/// Inclusive `[start, start + 6 days]` window.
pub fn forecast_window(start: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = start
        .checked_add_days(Days::new(WINDOW_EXTRA_DAYS))
        .unwrap_or(start);
    (start, end)
}

/// Client for the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: reqwest::Client,
    base_url: String,
}

impl ForecastClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        start_date: NaiveDate,
    ) -> Result<RawForecast, AppError> {
        let (start, end) = forecast_window(start_date);
        let start_str = start.format("%Y-%m-%d").to_string();
        let end_str = end.format("%Y-%m-%d").to_string();
        let lat_str = latitude.to_string();
        let lon_str = longitude.to_string();

        let response = self
            .client
            .get(format!("{}{}", self.base_url, FORECAST_PATH))
            .query(&[
                ("latitude", lat_str.as_str()),
                ("longitude", lon_str.as_str()),
                ("hourly", HOURLY_VARIABLES),
                ("daily", DAILY_VARIABLES),
                ("timezone", "auto"),
                ("current_weather", "true"),
                ("start_date", start_str.as_str()),
                ("end_date", end_str.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Forecast request for ({}, {}) failed: {}", latitude, longitude, e);
                AppError::ForecastUnavailable(format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                "Forecast for ({}, {}) returned HTTP {}",
                latitude,
                longitude,
                response.status()
            );
            return Err(AppError::ForecastUnavailable(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        let raw: RawForecast = response.json().await.map_err(|e| {
            tracing::warn!("Forecast response unparseable: {}", e);
            AppError::ForecastUnavailable(format!("invalid body: {}", e))
        })?;

        if raw.hourly.time.is_empty() {
            return Err(AppError::ForecastUnavailable(
                "hourly.time series missing".to_string(),
            ));
        }

        tracing::debug!(
            "Fetched {} hourly points for ({}, {}) from {} to {}",
            raw.hourly.time.len(),
            latitude,
            longitude,
            start_str,
            end_str
        );

        Ok(raw)
    }
}
