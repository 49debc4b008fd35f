//! Registry traits
//!
//! The storage collaborators behind the pod and minion REST storage. Kept
//! behind traits so the in-memory registry and test doubles are
//! interchangeable.

use crate::error::RegistryError;
use api::{Minion, MinionList, Pod, PodList};
use async_trait::async_trait;
use labels::Selector;
use watch::{Filter, Subscription};

/// Persistent pod records and their change feed.
#[async_trait]
pub trait PodRegistry: Send + Sync {
    /// Pods whose labels match `label`, with the registry's current version.
    async fn list_pods(&self, label: &Selector) -> Result<PodList, RegistryError>;

    async fn get_pod(&self, id: &str) -> Result<Pod, RegistryError>;

    /// Stores a new pod and returns it as persisted.
    async fn create_pod(&self, pod: Pod) -> Result<Pod, RegistryError>;

    /// Replaces an existing pod and returns it as persisted.
    async fn update_pod(&self, pod: Pod) -> Result<Pod, RegistryError>;

    async fn delete_pod(&self, id: &str) -> Result<(), RegistryError>;

    /// Subscribes to pod changes at or after `resource_version` that pass
    /// `filter`.
    async fn watch_pods(
        &self,
        resource_version: u64,
        filter: Filter<Pod>,
    ) -> Result<Subscription<Pod>, RegistryError>;
}

/// Known hosts.
#[async_trait]
pub trait MinionRegistry: Send + Sync {
    async fn list_minions(&self) -> Result<MinionList, RegistryError>;

    async fn get_minion(&self, id: &str) -> Result<Minion, RegistryError>;

    async fn create_minion(&self, minion: Minion) -> Result<Minion, RegistryError>;

    async fn delete_minion(&self, id: &str) -> Result<(), RegistryError>;

    /// True if `id` is a known host.
    async fn contains(&self, id: &str) -> Result<bool, RegistryError> {
        let minions = self.list_minions().await?;
        Ok(minions.items.iter().any(|m| m.id == id))
    }
}
