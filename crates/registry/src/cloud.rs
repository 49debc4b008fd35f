//! Cloud provider collaborator

use async_trait::async_trait;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("instance {0:?} not found")]
    InstanceNotFound(String),

    #[error("cloud provider error: {0}")]
    Provider(String),
}

/// Instance lookups against the cloud the hosts run in.
#[async_trait]
pub trait CloudInstances: Send + Sync {
    /// Address of the instance backing `host`.
    async fn ip_address(&self, host: &str) -> Result<IpAddr, CloudError>;
}
