//! PodInfoGetter trait for mocking
//!
//! The concrete [`HttpPodInfoGetter`](crate::HttpPodInfoGetter) implements
//! this trait, and tests can use [`MockPodInfoGetter`](crate::MockPodInfoGetter)
//! when the `test-util` feature is enabled.

use crate::error::PodInfoError;
use api::PodInfo;

/// Reports the runtime state of a pod's containers on a given host.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait PodInfoGetter: Send + Sync {
    /// Per-container runtime snapshots of `pod_id` on `host`, keyed by
    /// container name.
    async fn get_pod_info(&self, host: &str, pod_id: &str) -> Result<PodInfo, PodInfoError>;
}
