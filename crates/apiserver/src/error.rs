//! API errors and their wire rendering

use api::{CodecError, ErrorList, Object, Status, StatusOutcome, StatusReason};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced to API clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{kind} {id:?} not found")]
    NotFound { kind: String, id: String },

    #[error("{kind} {id:?} already exists")]
    AlreadyExists { kind: String, id: String },

    /// The object failed validation; nothing was persisted
    #[error("{kind} {id:?} is invalid: {errors}")]
    Invalid {
        kind: String,
        id: String,
        errors: ErrorList,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    /// The operation did not finish before the caller stopped waiting
    #[error("operation is still in progress")]
    Timeout,

    /// Backend failure; the message is shown to the client as is
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn invalid(kind: impl Into<String>, id: impl Into<String>, errors: ErrorList) -> Self {
        ApiError::Invalid {
            kind: kind.into(),
            id: id.into(),
            errors,
        }
    }

    /// True for validation failures.
    pub fn is_invalid(&self) -> bool {
        matches!(self, ApiError::Invalid { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists { .. } => StatusCode::CONFLICT,
            ApiError::Invalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Timeout => StatusCode::ACCEPTED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error as a `Status` object.
    pub fn to_status(&self) -> Status {
        let code = self.status_code().as_u16();
        let message = self.to_string();
        match self {
            ApiError::NotFound { kind, id } => {
                Status::failure(StatusReason::NotFound, message, code).with_details(id, kind)
            }
            ApiError::AlreadyExists { kind, id } => {
                Status::failure(StatusReason::AlreadyExists, message, code).with_details(id, kind)
            }
            ApiError::Invalid { kind, id, .. } => {
                Status::failure(StatusReason::Invalid, message, code).with_details(id, kind)
            }
            ApiError::BadRequest(_) => Status::failure(StatusReason::BadRequest, message, code),
            ApiError::MethodNotAllowed(_) => {
                Status::failure(StatusReason::MethodNotAllowed, message, code)
            }
            ApiError::Timeout => Status {
                status: StatusOutcome::Working,
                ..Status::failure(StatusReason::Working, message, code)
            },
            ApiError::Internal(_) => Status::failure(StatusReason::InternalError, message, code),
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<labels::ParseError> for ApiError {
    fn from(err: labels::ParseError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.to_status();
        crate::handlers::object_response(self.status_code(), &Object::Status(status))
    }
}
