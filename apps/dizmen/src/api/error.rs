//! # API Errors
//!
//! Every handler returns `Result<_, ApiError>`. Core errors keep their meaning
//! and are translated to a status code and a JSON [`ErrorResponse`].
//!
//! | Error | Status |
//! |-------|--------|
//! | validation | 422 |
//! | not found, restaurant unavailable | 404 |
//! | invalid transition, draft / revision conflict, already onboarded | 409 |
//! | missing reason, invalid step, no documents, bad time of day | 400 |
//! | forbidden | 403 |
//! | missing or invalid token | 401 |
//! | rate limited | 429 |
//! | upload failed | 502 |
//! | storage failure | 503 |

use super::types::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dizmen_core::{DizmenError, FieldErrors};

#[derive(Debug)]
pub enum ApiError {
    /// An error raised by the platform.
    Core(DizmenError),
    /// No usable bearer token.
    Unauthorized(String),
    /// The global rate limiter refused the request.
    RateLimited,
}

impl From<DizmenError> for ApiError {
    fn from(error: DizmenError) -> Self {
        Self::Core(error)
    }
}

impl ApiError {
    /// Shorthand for a 403.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Core(DizmenError::Forbidden(message.into()))
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Core(e) => match e {
                DizmenError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DizmenError::NotFound { .. } | DizmenError::RestaurantUnavailable(_) => {
                    StatusCode::NOT_FOUND
                }
                DizmenError::InvalidTransition { .. }
                | DizmenError::DraftConflict { .. }
                | DizmenError::RevisionConflict { .. }
                | DizmenError::AlreadyOnboarded(_) => StatusCode::CONFLICT,
                DizmenError::MissingReason(_)
                | DizmenError::InvalidStep { .. }
                | DizmenError::NoDocuments
                | DizmenError::InvalidClockTime(_) => StatusCode::BAD_REQUEST,
                DizmenError::Forbidden(_) => StatusCode::FORBIDDEN,
                DizmenError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
                DizmenError::StorageError(_) => StatusCode::SERVICE_UNAVAILABLE,
                DizmenError::SerializationError(_)
                | DizmenError::ConfigError(_)
                | DizmenError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable machine-readable code for clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::Core(e) => match e {
                DizmenError::Validation(_) => "validation_failed",
                DizmenError::NotFound { .. } => "not_found",
                DizmenError::RestaurantUnavailable(_) => "restaurant_unavailable",
                DizmenError::InvalidTransition { .. } => "invalid_transition",
                DizmenError::DraftConflict { .. } => "draft_conflict",
                DizmenError::RevisionConflict { .. } => "revision_conflict",
                DizmenError::AlreadyOnboarded(_) => "already_onboarded",
                DizmenError::MissingReason(_) => "missing_reason",
                DizmenError::InvalidStep { .. } => "invalid_step",
                DizmenError::NoDocuments => "no_documents",
                DizmenError::InvalidClockTime(_) => "invalid_time",
                DizmenError::Forbidden(_) => "forbidden",
                DizmenError::UploadFailed(_) => "upload_failed",
                DizmenError::StorageError(_) => "storage_unavailable",
                DizmenError::SerializationError(_)
                | DizmenError::ConfigError(_)
                | DizmenError::IoError(_) => "internal_error",
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Unauthorized(reason) => format!("Unauthorized: {reason}"),
            Self::RateLimited => "Too Many Requests".to_string(),
            // Internal details stay in the log.
            Self::Core(
                DizmenError::SerializationError(_)
                | DizmenError::ConfigError(_)
                | DizmenError::IoError(_),
            ) => "Internal server error".to_string(),
            Self::Core(e) => e.to_string(),
        }
    }

    fn fields(&self) -> FieldErrors {
        match self {
            Self::Core(DizmenError::Validation(fields)) => fields.clone(),
            _ => FieldErrors::new(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        match &self {
            Self::Core(e) if status.is_server_error() => {
                tracing::error!(event = "request_failed", code, error = %e, "Request failed");
            }
            Self::Unauthorized(reason) => {
                tracing::warn!(event = "auth_failure", reason = %reason, "Authentication failed");
            }
            Self::Core(DizmenError::Forbidden(reason)) => {
                tracing::warn!(event = "forbidden", reason = %reason, "Request forbidden");
            }
            Self::RateLimited => tracing::warn!("Rate limit exceeded"),
            Self::Core(e) => tracing::debug!(code, error = %e, "Request rejected"),
        }

        let body = ErrorResponse {
            success: false,
            error: self.message(),
            code: code.to_string(),
            fields: self.fields().0,
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dizmen_core::{RestaurantId, VerificationStatus};

    #[test]
    fn conflicts_are_409() {
        let errors = [
            DizmenError::DraftConflict {
                expected: 1,
                actual: 2,
            },
            DizmenError::RevisionConflict {
                id: RestaurantId::new("rest-1"),
                expected: 1,
                actual: 2,
            },
            DizmenError::InvalidTransition {
                from: VerificationStatus::Pending,
                action: "block",
            },
        ];
        for e in errors {
            assert_eq!(ApiError::from(e).status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn transient_storage_is_503() {
        let e = ApiError::from(DizmenError::StorageError("disk".to_string()));
        assert_eq!(e.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(e.code(), "storage_unavailable");
    }

    #[test]
    fn internal_details_are_hidden() {
        let e = ApiError::from(DizmenError::IoError("/var/secret/path".to_string()));
        assert!(!e.message().contains("/var/secret"));
    }

    #[test]
    fn validation_carries_fields() {
        let e = ApiError::from(DizmenError::Validation(FieldErrors::single(
            "name",
            "is required",
        )));
        assert_eq!(e.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(e.fields().contains("name"));
    }
}
