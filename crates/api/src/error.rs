use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use storefront_core::error::{BulkError, CoreError, RowError, ValidationError, ValidationErrorKind};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON
/// error responses of the shape `{ "error": ..., "code": ... }`;
/// per-row batch rejections additionally carry an `"errors"` array.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `storefront_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An aborting validation failure (spec'd kind carried as the code).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An all-or-nothing batch rejected for per-row violations.
    #[error("{} row(s) failed validation", .0.len())]
    RowErrors(Vec<RowError>),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<BulkError> for AppError {
    fn from(err: BulkError) -> Self {
        match err {
            BulkError::Validation(v) => AppError::Validation(v),
            BulkError::Rows(rows) => AppError::RowErrors(rows),
        }
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// HTTP status for an aborting validation kind.
fn validation_status(kind: ValidationErrorKind) -> StatusCode {
    match kind {
        ValidationErrorKind::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ValidationErrorKind::WrongMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ValidationErrorKind::MalformedNumber
        | ValidationErrorKind::InvertedRange
        | ValidationErrorKind::MissingRequiredColumn => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, rows) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                    None,
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                        None,
                    )
                }
            },

            // --- Contract validation errors: the kind is the code ---
            AppError::Validation(err) => (
                validation_status(err.kind),
                err.kind.as_str(),
                err.message.clone(),
                None,
            ),

            AppError::RowErrors(errors) => (
                StatusCode::BAD_REQUEST,
                "ROW_ERRORS",
                format!("{} row(s) failed validation", errors.len()),
                Some(errors.clone()),
            ),

            // --- Database errors ---
            AppError::Database(err) => {
                let (status, code, message) = classify_sqlx_error(err);
                (status, code, message, None)
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = match rows {
            Some(errors) => json!({ "error": message, "code": code, "errors": errors }),
            None => json!({ "error": message, "code": code }),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`)
///   map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::error::ValidationErrorKind;

    #[test]
    fn file_too_large_maps_to_413() {
        let err = AppError::Validation(ValidationError::new(
            ValidationErrorKind::FileTooLarge,
            "too big",
        ));
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn wrong_media_type_maps_to_415() {
        let err = AppError::Validation(ValidationError::new(
            ValidationErrorKind::WrongMediaType,
            "not csv",
        ));
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn inverted_range_maps_to_400() {
        let err = AppError::Validation(ValidationError::new(
            ValidationErrorKind::InvertedRange,
            "min > max",
        ));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::Core(CoreError::NotFound {
            entity: "Collection",
            id: 7,
        });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn row_errors_map_to_400() {
        let err = AppError::RowErrors(vec![RowError::new(0, "bad")]);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
