//! Test doubles for the registry collaborators
//!
//! Each double records the calls it receives so tests can assert on what
//! the REST storage did, or did not, touch.

use crate::cloud::{CloudError, CloudInstances};
use crate::error::RegistryError;
use crate::traits::{MinionRegistry, PodRegistry};
use api::{Minion, MinionList, Pod, PodList};
use async_trait::async_trait;
use labels::Selector;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use watch::{Broadcaster, Filter, Subscription};

/// Mock pod registry
///
/// `create_pod` and `update_pod` record the pod they were given even when
/// they fail. Once an error is set, every call fails with it.
#[derive(Debug, Clone)]
pub struct MockPodRegistry {
    pod: Arc<Mutex<Option<Pod>>>,
    pods: Arc<Mutex<Vec<Pod>>>,
    err: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    broadcaster: Arc<Broadcaster<Pod>>,
}

impl MockPodRegistry {
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self {
            pod: Arc::new(Mutex::new(None)),
            pods: Arc::new(Mutex::new(Vec::new())),
            err: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
            broadcaster: Arc::new(Broadcaster::new(10)),
        }
    }

    /// Pod returned by `get_pod`; also the last pod created or updated.
    pub fn set_pod(&self, pod: Pod) {
        *self.pod.lock().unwrap() = Some(pod);
    }

    pub fn pod(&self) -> Option<Pod> {
        self.pod.lock().unwrap().clone()
    }

    /// Pods returned by `list_pods`, before label filtering.
    pub fn set_pods(&self, pods: Vec<Pod>) {
        *self.pods.lock().unwrap() = pods;
    }

    pub fn set_error(&self, message: &str) {
        *self.err.lock().unwrap() = Some(message.to_string());
    }

    /// Names of the methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Feed behind `watch_pods`.
    pub fn broadcaster(&self) -> &Broadcaster<Pod> {
        &self.broadcaster
    }

    fn record(&self, call: &str) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.err.lock().unwrap().clone() {
            Some(message) => Err(RegistryError::Backend(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PodRegistry for MockPodRegistry {
    async fn list_pods(&self, label: &Selector) -> Result<PodList, RegistryError> {
        self.record("list-pods")?;
        let items = self
            .pods
            .lock()
            .unwrap()
            .iter()
            .filter(|pod| label.matches(&pod.labels))
            .cloned()
            .collect();
        Ok(PodList {
            resource_version: 0,
            items,
        })
    }

    async fn get_pod(&self, id: &str) -> Result<Pod, RegistryError> {
        self.record("get-pod")?;
        self.pod
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RegistryError::not_found("pod", id))
    }

    async fn create_pod(&self, pod: Pod) -> Result<Pod, RegistryError> {
        self.set_pod(pod.clone());
        self.record("create-pod")?;
        Ok(pod)
    }

    async fn update_pod(&self, pod: Pod) -> Result<Pod, RegistryError> {
        self.set_pod(pod.clone());
        self.record("update-pod")?;
        Ok(pod)
    }

    async fn delete_pod(&self, _id: &str) -> Result<(), RegistryError> {
        self.record("delete-pod")
    }

    async fn watch_pods(
        &self,
        resource_version: u64,
        filter: Filter<Pod>,
    ) -> Result<Subscription<Pod>, RegistryError> {
        self.record("watch-pods")?;
        Ok(self.broadcaster.watch(resource_version, filter))
    }
}

/// Mock minion registry over a fixed set of host names
#[derive(Debug, Clone, Default)]
pub struct MockMinionRegistry {
    minions: Arc<Mutex<Vec<String>>>,
    err: Arc<Mutex<Option<String>>>,
}

impl MockMinionRegistry {
    pub fn new<I, S>(minions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            minions: Arc::new(Mutex::new(minions.into_iter().map(Into::into).collect())),
            err: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_error(&self, message: &str) {
        *self.err.lock().unwrap() = Some(message.to_string());
    }

    fn check(&self) -> Result<(), RegistryError> {
        match self.err.lock().unwrap().clone() {
            Some(message) => Err(RegistryError::Backend(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MinionRegistry for MockMinionRegistry {
    async fn list_minions(&self) -> Result<MinionList, RegistryError> {
        self.check()?;
        let items = self
            .minions
            .lock()
            .unwrap()
            .iter()
            .map(|id| Minion {
                id: id.clone(),
                ..Default::default()
            })
            .collect();
        Ok(MinionList {
            resource_version: 0,
            items,
        })
    }

    async fn get_minion(&self, id: &str) -> Result<Minion, RegistryError> {
        self.check()?;
        if self.minions.lock().unwrap().iter().any(|m| m == id) {
            Ok(Minion {
                id: id.to_string(),
                ..Default::default()
            })
        } else {
            Err(RegistryError::not_found("minion", id))
        }
    }

    async fn create_minion(&self, minion: Minion) -> Result<Minion, RegistryError> {
        self.check()?;
        self.minions.lock().unwrap().push(minion.id.clone());
        Ok(minion)
    }

    async fn delete_minion(&self, id: &str) -> Result<(), RegistryError> {
        self.check()?;
        let mut minions = self.minions.lock().unwrap();
        let before = minions.len();
        minions.retain(|m| m != id);
        if minions.len() == before {
            return Err(RegistryError::not_found("minion", id));
        }
        Ok(())
    }
}

/// Fake cloud provider answering every lookup with the same address
#[derive(Debug, Clone, Default)]
pub struct FakeCloud {
    ip: Option<IpAddr>,
    err: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeCloud {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip: Some(ip),
            ..Default::default()
        }
    }

    /// A cloud whose every lookup fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            err: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudInstances for FakeCloud {
    async fn ip_address(&self, host: &str) -> Result<IpAddr, CloudError> {
        self.calls.lock().unwrap().push("ip-address".to_string());
        if let Some(message) = &self.err {
            return Err(CloudError::Provider(message.clone()));
        }
        self.ip
            .ok_or_else(|| CloudError::InstanceNotFound(host.to_string()))
    }
}
