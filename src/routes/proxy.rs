//! Reverse-geocode passthrough.
//!
//! GET /api/proxy/reverse-geocode?latitude=..&longitude=..&language=..

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use super::AppState;
use crate::errors::{AppError, ErrorResponse};

const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReverseGeocodeQuery {
    /// Latitude (WGS84)
    pub latitude: Option<String>,
    /// Longitude (WGS84)
    pub longitude: Option<String>,
    /// Result language, defaults to "en"
    pub language: Option<String>,
}

/// Proxy a reverse-geocoding lookup to Open-Meteo and return its JSON as-is.
#[utoipa::path(
    get,
    path = "/api/proxy/reverse-geocode",
    tag = "Geocoding",
    params(ReverseGeocodeQuery),
    responses(
        (status = 200, description = "Provider response, unchanged", body = Object),
        (status = 400, description = "Missing coordinates", body = ErrorResponse),
        (status = 502, description = "Provider unreachable", body = ErrorResponse),
    )
)]
pub(crate) async fn reverse_geocode(
    State(state): State<AppState>,
    Query(params): Query<ReverseGeocodeQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let non_empty = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let (Some(latitude), Some(longitude)) =
        (non_empty(&params.latitude), non_empty(&params.longitude))
    else {
        return Err(AppError::ValidationFailed("Missing coordinates".to_string()));
    };
    let language = non_empty(&params.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let body = state
        .providers
        .geocoder
        .reverse(&latitude, &longitude, &language)
        .await?;
    Ok(Json(body))
}
