use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::engine::transitions::TransitionError;
use crate::models::parcel::ParseStatusError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing text, without the variant prefix used by `Display`.
    fn detail(self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::Internal(msg) => msg,
            AppError::InvalidTransition(err) => err.to_string(),
        }
    }
}

impl From<ParseStatusError> for AppError {
    fn from(err: ParseStatusError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

// Malformed or incomplete bodies must not share 422 with rejected transitions.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(msg) = &self {
            tracing::error!(error = %msg, "request failed");
        }

        let status = self.status_code();
        (status, Json(ErrorBody { error: self.detail() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::AppError;
    use crate::engine::transitions::TransitionError;
    use crate::models::parcel::ParcelStatus;

    #[test]
    fn rejected_transition_is_unprocessable() {
        let err = AppError::from(TransitionError::InvalidTransition {
            from: ParcelStatus::Delivered,
            to: ParcelStatus::Cancelled,
        });
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unknown_status_text_is_bad_request() {
        let err: AppError = "lost".parse::<ParcelStatus>().unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
