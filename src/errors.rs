use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Stable machine-readable error kind (e.g. "duplicate_record")
    pub code: String,
    /// Identity of the conflicting record, for duplicate errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Geocoding returned no match, an unparseable body, or was unreachable.
    #[error("City not found: {0}")]
    ResolutionFailed(String),

    /// Forecast provider unreachable, non-success, or structurally incomplete.
    #[error("Weather data not found: {0}")]
    ForecastUnavailable(String),

    #[error("Entry for this city and date already exists")]
    DuplicateRecord { existing_id: Option<Uuid> },

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Database error: {0}")]
    StorageFailure(sqlx::Error),
}

impl AppError {
    /// Machine-readable code; one per error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::ValidationFailed(_) => "validation_failed",
            AppError::ResolutionFailed(_) => "resolution_failed",
            AppError::ForecastUnavailable(_) => "forecast_unavailable",
            AppError::DuplicateRecord { .. } => "duplicate_record",
            AppError::ExternalServiceError(_) => "upstream_error",
            AppError::StorageFailure(_) => "storage_failure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_)
            | AppError::ResolutionFailed(_)
            | AppError::ForecastUnavailable(_) => StatusCode::NOT_FOUND,
            AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateRecord { .. } => StatusCode::CONFLICT,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::DuplicateRecord { existing_id: None }
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                AppError::ValidationFailed(db_err.message().to_string())
            }
            _ => AppError::StorageFailure(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationFailed(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationFailed(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let (message, existing_id) = match &self {
            AppError::StorageFailure(err) => {
                tracing::error!("Database error: {:?}", err);
                ("Internal database error".to_string(), None)
            }
            AppError::DuplicateRecord { existing_id } => (self.to_string(), *existing_id),
            AppError::NotFound(msg) | AppError::ValidationFailed(msg) => (msg.clone(), None),
            AppError::ResolutionFailed(_) => ("City not found".to_string(), None),
            AppError::ForecastUnavailable(_) => ("Weather data not found".to_string(), None),
            AppError::ExternalServiceError(msg) => (msg.clone(), None),
        };

        (
            status,
            axum::Json(ErrorResponse {
                error: message,
                code,
                existing_id,
            }),
        )
            .into_response()
    }
}
