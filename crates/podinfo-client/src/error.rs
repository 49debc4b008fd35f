//! Container-host client errors

use thiserror::Error;

/// Errors that can occur when asking a container host about a pod
#[derive(Debug, Error)]
pub enum PodInfoError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host does not know the pod
    #[error("pod {pod_id:?} not found on host {host:?}")]
    NotFound { host: String, pod_id: String },

    /// The host answered with an unexpected status
    #[error("container host {host:?} returned {status}: {body}")]
    Api {
        host: String,
        status: u16,
        body: String,
    },

    /// The host's reply could not be decoded
    #[error("malformed pod info: {0}")]
    Serialization(#[from] serde_json::Error),
}
