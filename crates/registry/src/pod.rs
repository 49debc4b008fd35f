//! Pod REST storage
//!
//! Serves the `pods` collection on top of a [`PodRegistry`]. Reads are
//! enriched from the collaborators that are configured:
//!
//! - runtime snapshots and the pod IP from the pod's host
//! - the derived phase, using the minion registry for host reachability
//! - the host IP from the cloud provider
//!
//! Enrichment failures are logged and leave the last known values in place.
//! Creates wait in the background until the new pod reaches a stable phase
//! or the wait bound elapses.

use crate::cloud::CloudInstances;
use crate::traits::{MinionRegistry, PodRegistry};
use crate::status::{get_pod_status, pod_host};
use api::validation::validate_pod;
use api::{FieldSource, Object, Pod, Status, NETWORK_CONTAINER_NAME};
use apiserver::{make_async, ApiError, AsyncResult, EventStream, ResourceWatcher, RestStorage};
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use labels::Selector;
use podinfo_client::PodInfoGetter;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(100);
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct Inner {
    registry: Arc<dyn PodRegistry>,
    minions: Option<Arc<dyn MinionRegistry>>,
    pod_info: Option<Arc<dyn PodInfoGetter>>,
    cloud: Option<Arc<dyn CloudInstances>>,
    poll_period: Duration,
    wait_timeout: Duration,
}

/// REST storage for pods
#[derive(Clone)]
pub struct PodStorage {
    inner: Inner,
}

impl PodStorage {
    pub fn new(registry: Arc<dyn PodRegistry>) -> Self {
        Self {
            inner: Inner {
                registry,
                minions: None,
                pod_info: None,
                cloud: None,
                poll_period: DEFAULT_POLL_PERIOD,
                wait_timeout: DEFAULT_WAIT_TIMEOUT,
            },
        }
    }

    /// Derives the phase of pods read through this storage, using `minions`
    /// to check host reachability.
    #[must_use]
    pub fn with_minions(mut self, minions: Arc<dyn MinionRegistry>) -> Self {
        self.inner.minions = Some(minions);
        self
    }

    /// Fills runtime snapshots from the pods' hosts.
    #[must_use]
    pub fn with_pod_info(mut self, pod_info: Arc<dyn PodInfoGetter>) -> Self {
        self.inner.pod_info = Some(pod_info);
        self
    }

    /// Resolves host IPs through `cloud`.
    #[must_use]
    pub fn with_cloud(mut self, cloud: Arc<dyn CloudInstances>) -> Self {
        self.inner.cloud = Some(cloud);
        self
    }

    /// Sets how often a create polls for a stable phase, and for how long.
    #[must_use]
    pub fn with_polling(mut self, poll_period: Duration, wait_timeout: Duration) -> Self {
        self.inner.poll_period = poll_period;
        self.inner.wait_timeout = wait_timeout;
        self
    }
}

impl fmt::Debug for PodStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodStorage")
            .field("minions", &self.inner.minions.is_some())
            .field("pod_info", &self.inner.pod_info.is_some())
            .field("cloud", &self.inner.cloud.is_some())
            .field("poll_period", &self.inner.poll_period)
            .field("wait_timeout", &self.inner.wait_timeout)
            .finish()
    }
}

impl Inner {
    /// Copies the host's runtime snapshots into the pod's current state and
    /// extracts the pod IP from the network container.
    async fn fill_pod_info(&self, pod: &mut Pod) {
        let Some(getter) = &self.pod_info else {
            return;
        };
        let host = pod_host(pod).to_string();
        if host.is_empty() {
            return;
        }
        match getter.get_pod_info(&host, &pod.id).await {
            Ok(info) => {
                pod.current_state.pod_ip = info
                    .get(NETWORK_CONTAINER_NAME)
                    .and_then(|net| net.ip_address())
                    .unwrap_or_default()
                    .to_string();
                pod.current_state.info = info;
            }
            Err(err) => {
                warn!(id = %pod.id, %host, error = %err, "pod info unavailable, keeping last known");
            }
        }
    }

    async fn get_pod(&self, id: &str) -> Result<Pod, ApiError> {
        let mut pod = self.registry.get_pod(id).await?;
        self.fill_pod_info(&mut pod).await;

        if let Some(minions) = &self.minions {
            let (phase, _) = get_pod_status(&pod, minions.as_ref()).await;
            pod.current_state.status = Some(phase);
        }

        if let Some(cloud) = &self.cloud {
            let host = pod_host(&pod).to_string();
            match cloud.ip_address(&host).await {
                Ok(ip) => pod.current_state.host_ip = ip.to_string(),
                Err(err) => debug!(id = %pod.id, %host, error = %err, "host ip not resolved"),
            }
        }
        Ok(pod)
    }

    /// Re-reads the pod until its phase is stable or the wait bound elapses,
    /// returning the last pod observed.
    async fn wait_for_stable(&self, id: &str) -> Result<Pod, ApiError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let pod = self.get_pod(id).await?;
            if pod.current_state.status.is_some_and(|phase| phase.is_stable()) {
                return Ok(pod);
            }
            if Instant::now() >= deadline {
                debug!(%id, "pod not stable before wait bound, returning last seen");
                return Ok(pod);
            }
            tokio::time::sleep(self.poll_period).await;
        }
    }
}

fn expect_pod(object: Object) -> Result<Pod, ApiError> {
    let kind = object.kind();
    object
        .into_pod()
        .ok_or_else(|| ApiError::BadRequest(format!("expected a Pod, got {kind}")))
}

/// Assigns an id and a manifest uuid when missing and copies the id into the
/// manifest.
fn assign_identity(pod: &mut Pod) {
    if pod.id.is_empty() {
        pod.id = Uuid::new_v4().to_string();
    }
    let manifest = &mut pod.desired_state.manifest;
    manifest.id.clone_from(&pod.id);
    if manifest.uuid.is_empty() {
        manifest.uuid = Uuid::new_v4().to_string();
    }
    if pod.creation_timestamp.is_none() {
        pod.creation_timestamp = Some(Utc::now());
    }
}

#[async_trait]
impl RestStorage for PodStorage {
    fn new_object(&self) -> Object {
        Object::Pod(Pod::default())
    }

    async fn list(&self, label: &Selector, field: &Selector) -> Result<Object, ApiError> {
        let mut list = self.inner.registry.list_pods(label).await?;
        list.items.retain(|pod| field.matches(&pod.fields()));
        Ok(Object::PodList(list))
    }

    async fn get(&self, id: &str) -> Result<Object, ApiError> {
        Ok(Object::Pod(self.inner.get_pod(id).await?))
    }

    fn create(&self, object: Object) -> Result<AsyncResult, ApiError> {
        let mut pod = expect_pod(object)?;
        assign_identity(&mut pod);
        let errors = validate_pod(&pod);
        if !errors.is_empty() {
            return Err(ApiError::invalid("pod", pod.id, errors));
        }

        info!(id = %pod.id, "creating pod");
        let inner = self.inner.clone();
        Ok(make_async(async move {
            let id = pod.id.clone();
            inner.registry.create_pod(pod).await?;
            Ok(Object::Pod(inner.wait_for_stable(&id).await?))
        }))
    }

    fn update(&self, object: Object) -> Result<AsyncResult, ApiError> {
        let pod = expect_pod(object)?;
        let errors = validate_pod(&pod);
        if !errors.is_empty() {
            return Err(ApiError::invalid("pod", pod.id, errors));
        }

        info!(id = %pod.id, "updating pod");
        let inner = self.inner.clone();
        Ok(make_async(async move {
            let id = pod.id.clone();
            inner.registry.update_pod(pod).await?;
            Ok(Object::Pod(inner.get_pod(&id).await?))
        }))
    }

    fn delete(&self, id: &str) -> Result<AsyncResult, ApiError> {
        info!(%id, "deleting pod");
        let inner = self.inner.clone();
        let id = id.to_string();
        Ok(make_async(async move {
            inner.registry.delete_pod(&id).await?;
            Ok(Object::Status(Status::success()))
        }))
    }

    fn as_watcher(&self) -> Option<&dyn ResourceWatcher> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWatcher for PodStorage {
    async fn watch(
        &self,
        label: Selector,
        field: Selector,
        resource_version: u64,
    ) -> Result<EventStream, ApiError> {
        let filter = Box::new(move |pod: &Pod| {
            label.matches(&pod.labels) && field.matches(&pod.fields())
        });
        let subscription = self
            .inner
            .registry
            .watch_pods(resource_version, filter)
            .await?;
        Ok(subscription
            .into_stream()
            .map(|event| event.map(Object::Pod))
            .boxed())
    }
}
