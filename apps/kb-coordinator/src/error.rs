//! Engine error → HTTP response mapping.
//!
//! Every failure body is an `ErrorResponse { error, code }`. Storage and
//! serialisation failures are logged with detail but answered with a generic
//! message; everything else surfaces its engine message, which never contains
//! key or signature material.

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use tracing::error;

use kb_core::CoreError;
use kb_proto::api::ErrorResponse;

#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self.0 {
            CoreError::Validation(_) => "VALIDATION",
            CoreError::Unauthenticated => "UNAUTHENTICATED",
            CoreError::Conflict { .. } => "CONFLICT",
            CoreError::NotFound => "NOT_FOUND",
            CoreError::InvalidState { .. } => "INVALID_STATE",
            CoreError::Serialisation(_) | CoreError::Store(_) => "INTERNAL",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
            CoreError::NotFound => StatusCode::NOT_FOUND,
            CoreError::Conflict { .. } | CoreError::InvalidState { .. } => StatusCode::CONFLICT,
            CoreError::Serialisation(_) | CoreError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match &self.0 {
            CoreError::Serialisation(err) => {
                error!(%err, "serialisation failure");
                "internal error".to_string()
            }
            CoreError::Store(err) => {
                error!(%err, "storage failure");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: message,
            code: self.code().to_string(),
        })
    }
}
