//! In-memory registry
//!
//! Holds pods and minions in process memory. Every write bumps a single
//! registry-wide resource version and, for pods, is published to the watch
//! broadcaster while the state lock is held, so subscribers observe writes
//! in version order.

use crate::error::RegistryError;
use crate::traits::{MinionRegistry, PodRegistry};
use api::{Minion, MinionList, Pod, PodList};
use async_trait::async_trait;
use chrono::Utc;
use labels::Selector;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use watch::{Broadcaster, EventType, Filter, Subscription};

#[derive(Debug, Default)]
struct State {
    version: u64,
    pods: BTreeMap<String, Pod>,
    minions: BTreeMap<String, Minion>,
}

impl State {
    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

/// Registry backed by process memory
#[derive(Debug)]
pub struct MemoryRegistry {
    state: Mutex<State>,
    pods: Broadcaster<Pod>,
}

impl MemoryRegistry {
    /// Creates an empty registry. Watch subscriptions buffer up to
    /// `watch_queue_len` events each.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(watch_queue_len: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            pods: Broadcaster::new(watch_queue_len),
        }
    }

    /// The version assigned to the most recent write.
    pub async fn resource_version(&self) -> u64 {
        self.state.lock().await.version
    }

    /// Stops the pod feed, closing every watch subscription.
    pub async fn shutdown(&self) {
        self.pods.shutdown().await;
    }

    async fn publish(&self, kind: EventType, pod: Pod) {
        let id = pod.id.clone();
        if let Err(err) = self.pods.action(kind, pod).await {
            warn!(%id, error = %err, "pod event not published");
        }
    }
}

#[async_trait]
impl PodRegistry for MemoryRegistry {
    async fn list_pods(&self, label: &Selector) -> Result<PodList, RegistryError> {
        let state = self.state.lock().await;
        let items = state
            .pods
            .values()
            .filter(|pod| label.matches(&pod.labels))
            .cloned()
            .collect();
        Ok(PodList {
            resource_version: state.version,
            items,
        })
    }

    async fn get_pod(&self, id: &str) -> Result<Pod, RegistryError> {
        self.state
            .lock()
            .await
            .pods
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("pod", id))
    }

    async fn create_pod(&self, mut pod: Pod) -> Result<Pod, RegistryError> {
        let mut state = self.state.lock().await;
        if state.pods.contains_key(&pod.id) {
            return Err(RegistryError::already_exists("pod", pod.id));
        }
        pod.resource_version = state.next_version();
        if pod.creation_timestamp.is_none() {
            pod.creation_timestamp = Some(Utc::now());
        }
        state.pods.insert(pod.id.clone(), pod.clone());
        debug!(id = %pod.id, resource_version = pod.resource_version, "pod created");
        self.publish(EventType::Added, pod.clone()).await;
        Ok(pod)
    }

    async fn update_pod(&self, mut pod: Pod) -> Result<Pod, RegistryError> {
        let mut state = self.state.lock().await;
        let Some(existing) = state.pods.get(&pod.id) else {
            return Err(RegistryError::not_found("pod", pod.id));
        };
        pod.creation_timestamp = existing.creation_timestamp;
        pod.resource_version = state.next_version();
        state.pods.insert(pod.id.clone(), pod.clone());
        debug!(id = %pod.id, resource_version = pod.resource_version, "pod updated");
        self.publish(EventType::Modified, pod.clone()).await;
        Ok(pod)
    }

    async fn delete_pod(&self, id: &str) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        let Some(mut pod) = state.pods.remove(id) else {
            return Err(RegistryError::not_found("pod", id));
        };
        pod.resource_version = state.next_version();
        debug!(%id, resource_version = pod.resource_version, "pod deleted");
        self.publish(EventType::Deleted, pod).await;
        Ok(())
    }

    async fn watch_pods(
        &self,
        resource_version: u64,
        filter: Filter<Pod>,
    ) -> Result<Subscription<Pod>, RegistryError> {
        Ok(self.pods.watch(resource_version, filter))
    }
}

#[async_trait]
impl MinionRegistry for MemoryRegistry {
    async fn list_minions(&self) -> Result<MinionList, RegistryError> {
        let state = self.state.lock().await;
        Ok(MinionList {
            resource_version: state.version,
            items: state.minions.values().cloned().collect(),
        })
    }

    async fn get_minion(&self, id: &str) -> Result<Minion, RegistryError> {
        self.state
            .lock()
            .await
            .minions
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("minion", id))
    }

    async fn create_minion(&self, mut minion: Minion) -> Result<Minion, RegistryError> {
        let mut state = self.state.lock().await;
        if state.minions.contains_key(&minion.id) {
            return Err(RegistryError::already_exists("minion", minion.id));
        }
        minion.resource_version = state.next_version();
        if minion.creation_timestamp.is_none() {
            minion.creation_timestamp = Some(Utc::now());
        }
        state.minions.insert(minion.id.clone(), minion.clone());
        debug!(id = %minion.id, "minion registered");
        Ok(minion)
    }

    async fn delete_minion(&self, id: &str) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        if state.minions.remove(id).is_none() {
            return Err(RegistryError::not_found("minion", id));
        }
        state.next_version();
        debug!(%id, "minion removed");
        Ok(())
    }

    async fn contains(&self, id: &str) -> Result<bool, RegistryError> {
        Ok(self.state.lock().await.minions.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(id: &str, name: &str) -> Pod {
        let mut labels = BTreeMap::new();
        labels.insert("name".to_string(), name.to_string());
        Pod {
            id: id.to_string(),
            labels,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_versions_increase_on_every_write() {
        let registry = MemoryRegistry::new(10);
        let a = registry.create_pod(pod("a", "foo")).await.unwrap();
        let b = registry.create_pod(pod("b", "bar")).await.unwrap();
        let a2 = registry.update_pod(pod("a", "baz")).await.unwrap();

        assert!(a.resource_version < b.resource_version);
        assert!(b.resource_version < a2.resource_version);
        assert_eq!(a2.creation_timestamp, a.creation_timestamp);
        assert!(a.creation_timestamp.is_some());
        assert_eq!(registry.resource_version().await, a2.resource_version);
    }

    #[tokio::test]
    async fn test_list_filters_by_label() {
        let registry = MemoryRegistry::new(10);
        registry.create_pod(pod("a", "foo")).await.unwrap();
        registry.create_pod(pod("b", "bar")).await.unwrap();

        let list = registry
            .list_pods(&Selector::parse("name=bar").unwrap())
            .await
            .unwrap();
        let ids: Vec<_> = list.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(list.resource_version, 2);
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_pods() {
        let registry = MemoryRegistry::new(10);
        registry.create_pod(pod("a", "foo")).await.unwrap();

        assert!(matches!(
            registry.create_pod(pod("a", "foo")).await,
            Err(RegistryError::AlreadyExists { .. })
        ));
        assert!(matches!(
            registry.update_pod(pod("missing", "foo")).await,
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            registry.delete_pod("missing").await,
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            registry.get_pod("missing").await,
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_writes_are_published_in_order() {
        let registry = MemoryRegistry::new(10);
        let mut subscription = registry
            .watch_pods(0, Box::new(|_| true))
            .await
            .unwrap();

        registry.create_pod(pod("a", "foo")).await.unwrap();
        registry.update_pod(pod("a", "bar")).await.unwrap();
        registry.delete_pod("a").await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let event = subscription.recv().await.unwrap();
            seen.push((event.kind, event.object.resource_version));
        }
        assert_eq!(
            seen,
            vec![
                (EventType::Added, 1),
                (EventType::Modified, 2),
                (EventType::Deleted, 3),
            ]
        );

        registry.shutdown().await;
        assert!(subscription.recv().await.is_err());
    }

    #[tokio::test]
    async fn test_watch_resumes_from_version() {
        let registry = MemoryRegistry::new(10);
        let mut subscription = registry
            .watch_pods(2, Box::new(|_| true))
            .await
            .unwrap();

        registry.create_pod(pod("a", "foo")).await.unwrap();
        registry.create_pod(pod("b", "foo")).await.unwrap();

        let event = subscription.recv().await.unwrap();
        assert_eq!(event.object.id, "b");
    }

    #[tokio::test]
    async fn test_minions() {
        let registry = MemoryRegistry::new(10);
        registry
            .create_minion(Minion {
                id: "machine".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(registry.contains("machine").await.unwrap());
        assert!(!registry.contains("other").await.unwrap());
        assert_eq!(registry.list_minions().await.unwrap().items.len(), 1);

        registry.delete_minion("machine").await.unwrap();
        assert!(!registry.contains("machine").await.unwrap());
        assert!(matches!(
            registry.get_minion("machine").await,
            Err(RegistryError::NotFound { .. })
        ));
    }
}
