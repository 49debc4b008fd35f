//! Registry errors

use apiserver::ApiError;
use thiserror::Error;

/// Errors returned by pod and minion registries
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} {id:?} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id:?} already exists")]
    AlreadyExists { kind: &'static str, id: String },

    /// Storage failure; the message is reported to clients as is
    #[error("{0}")]
    Backend(String),
}

impl RegistryError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        RegistryError::NotFound { kind, id: id.into() }
    }

    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        RegistryError::AlreadyExists { kind, id: id.into() }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { kind, id } => ApiError::not_found(kind, id),
            RegistryError::AlreadyExists { kind, id } => ApiError::AlreadyExists {
                kind: kind.to_string(),
                id,
            },
            RegistryError::Backend(message) => ApiError::Internal(message),
        }
    }
}
