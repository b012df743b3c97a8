//! Open-Meteo geocoding client.
//!
//! Forward lookups resolve a free-text city (plus optional country hint) to
//! coordinates and an ISO country code. Every failure mode (transport
//! error, non-success status, unparseable body, zero results) collapses into
//! `AppError::ResolutionFailed`; callers get one "could not resolve" signal
//! and the cause is only logged.
//!
//! See: https://open-meteo.com/en/docs/geocoding-api

use std::time::Duration;

use serde::Deserialize;

use crate::errors::AppError;

const SEARCH_PATH: &str = "/v1/search";
const REVERSE_PATH: &str = "/v1/reverse";
const LOOKUP_LANGUAGE: &str = "en";

fn upstream_failed() -> AppError {
    AppError::ExternalServiceError("Reverse geocoding service unavailable".to_string())
}

/// A resolved location.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// ISO 3166-1 alpha-2, upper-cased. Absent when the provider omits it.
    pub country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    latitude: f64,
    longitude: f64,
    country_code: Option<String>,
}

/// Client for the Open-Meteo geocoding API.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: reqwest::Client,
    base_url: String,
}

/// Build the single best-match query: `"<city>"` or `"<city>, <country>"`.
pub fn build_query(city: &str, country_hint: Option<&str>) -> String {
    match country_hint.map(str::trim).filter(|c| !c.is_empty()) {
        Some(country) => format!("{}, {}", city.trim(), country),
        None => city.trim().to_string(),
    }
}

impl GeocodingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a city name to coordinates. No caching: every call hits the provider.
    pub async fn resolve(
        &self,
        city: &str,
        country_hint: Option<&str>,
    ) -> Result<GeoLocation, AppError> {
        let query = build_query(city, country_hint);
        let not_found = || AppError::ResolutionFailed(query.clone());

        let response = self
            .client
            .get(format!("{}{}", self.base_url, SEARCH_PATH))
            .query(&[
                ("name", query.as_str()),
                ("count", "1"),
                ("language", LOOKUP_LANGUAGE),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Geocoding request for '{}' failed: {}", query, e);
                not_found()
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                "Geocoding for '{}' returned HTTP {}",
                query,
                response.status()
            );
            return Err(not_found());
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            tracing::warn!("Geocoding response for '{}' unparseable: {}", query, e);
            not_found()
        })?;

        let first = body.results.into_iter().next().ok_or_else(|| {
            tracing::debug!("Geocoding found no match for '{}'", query);
            not_found()
        })?;

        tracing::debug!(
            "Resolved '{}' to ({}, {})",
            query,
            first.latitude,
            first.longitude
        );

        Ok(GeoLocation {
            latitude: first.latitude,
            longitude: first.longitude,
            country_code: first
                .country_code
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
        })
    }

    /// Reverse lookup passthrough: returns the provider's JSON unchanged.
    pub async fn reverse(
        &self,
        latitude: &str,
        longitude: &str,
        language: &str,
    ) -> Result<serde_json::Value, AppError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, REVERSE_PATH))
            .query(&[
                ("latitude", latitude),
                ("longitude", longitude),
                ("language", language),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Reverse geocoding for ({}, {}) failed: {}", latitude, longitude, e);
                upstream_failed()
            })?;

        if !response.status().is_success() {
            tracing::warn!(
                "Reverse geocoding for ({}, {}) returned HTTP {}",
                latitude,
                longitude,
                response.status()
            );
            return Err(upstream_failed());
        }

        response.json().await.map_err(|e| {
            tracing::warn!("Reverse geocoding response unparseable: {}", e);
            upstream_failed()
        })
    }
}
