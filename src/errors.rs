use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;

use crate::domain::errors::{DomainError, ErrorCategory};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Missing or malformed X-User-Id header")]
    Unauthenticated,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Domain(e) => e.code(),
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Wording shown to end users. Validation errors are specific enough to
    /// show as-is; the other kinds get a stable phrase per category.
    fn user_message(&self) -> String {
        match self {
            AppError::Domain(e) => match e.category() {
                ErrorCategory::Validation | ErrorCategory::NotFound => e.to_string(),
                ErrorCategory::Authorization => "You don't have permission to do this".to_string(),
                ErrorCategory::StateConflict => "This opportunity is no longer available".to_string(),
                ErrorCategory::Infrastructure => "Service temporarily unavailable, please retry".to_string(),
            },
            AppError::Unauthenticated => self.to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(e) => match e.category() {
                ErrorCategory::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCategory::Authorization => StatusCode::FORBIDDEN,
                ErrorCategory::StateConflict => StatusCode::CONFLICT,
                ErrorCategory::NotFound => StatusCode::NOT_FOUND,
                ErrorCategory::Infrastructure => StatusCode::SERVICE_UNAVAILABLE,
            },
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        }
        let mut body = json!({
            "error": self.code(),
            "message": self.user_message(),
        });
        if let AppError::Domain(e) = self {
            if matches!(e.category(), ErrorCategory::Authorization | ErrorCategory::StateConflict) {
                body["detail"] = json!(e.to_string());
            }
        }
        HttpResponse::build(status).json(body)
    }
}
