//! In-memory storage for exercising the HTTP surface

#![allow(dead_code)]

use api::{FieldSource, JsonCodec, Object, Pod, PodList, Status};
use apiserver::{
    handle, make_async, ApiError, ApiServer, AsyncResult, EventStream, ResourceWatcher, RestStorage,
};
use axum::Router;
use futures::StreamExt;
use labels::Selector;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use watch::Broadcaster;

pub const PREFIX: &str = "/prefix/version";

/// Selectors and resume version passed to the last watch call
#[derive(Debug, Clone, PartialEq)]
pub struct WatchRequest {
    pub label: String,
    pub field: String,
    pub resource_version: u64,
}

pub struct SimpleStorage {
    pub watchable: bool,
    pub broadcaster: Broadcaster<Object>,
    pub pods: Arc<Mutex<BTreeMap<String, Pod>>>,
    pub err: Arc<Mutex<Option<String>>>,
    pub delay: Duration,
    pub requested: Mutex<Option<WatchRequest>>,
}

impl SimpleStorage {
    pub fn new() -> Self {
        Self {
            watchable: true,
            broadcaster: Broadcaster::new(10),
            pods: Arc::new(Mutex::new(BTreeMap::new())),
            err: Arc::new(Mutex::new(None)),
            delay: Duration::ZERO,
            requested: Mutex::new(None),
        }
    }

    pub fn insert(&self, pod: Pod) {
        self.pods.lock().unwrap().insert(pod.id.clone(), pod);
    }

    pub fn requested(&self) -> Option<WatchRequest> {
        self.requested.lock().unwrap().clone()
    }
}

fn expect_pod(object: Object) -> Result<Pod, ApiError> {
    object
        .into_pod()
        .ok_or_else(|| ApiError::BadRequest("expected a pod".to_string()))
}

#[async_trait::async_trait]
impl RestStorage for SimpleStorage {
    fn new_object(&self) -> Object {
        Object::Pod(Pod::default())
    }

    async fn list(&self, label: &Selector, field: &Selector) -> Result<Object, ApiError> {
        if let Some(err) = self.err.lock().unwrap().clone() {
            return Err(ApiError::Internal(err));
        }
        let items = self
            .pods
            .lock()
            .unwrap()
            .values()
            .filter(|pod| label.matches(&pod.labels) && field.matches(&pod.fields()))
            .cloned()
            .collect();
        Ok(Object::PodList(PodList {
            resource_version: 0,
            items,
        }))
    }

    async fn get(&self, id: &str) -> Result<Object, ApiError> {
        self.pods
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .map(Object::Pod)
            .ok_or_else(|| ApiError::not_found("pod", id))
    }

    fn create(&self, object: Object) -> Result<AsyncResult, ApiError> {
        let pod = expect_pod(object)?;
        if pod.id.is_empty() {
            let errors = api::validation::validate_pod(&pod);
            return Err(ApiError::invalid("pod", "", errors));
        }
        let pods = Arc::clone(&self.pods);
        let err = self.err.lock().unwrap().clone();
        let delay = self.delay;
        Ok(make_async(async move {
            tokio::time::sleep(delay).await;
            if let Some(err) = err {
                return Err(ApiError::Internal(err));
            }
            pods.lock().unwrap().insert(pod.id.clone(), pod.clone());
            Ok(Object::Pod(pod))
        }))
    }

    fn update(&self, object: Object) -> Result<AsyncResult, ApiError> {
        let pod = expect_pod(object)?;
        let pods = Arc::clone(&self.pods);
        Ok(make_async(async move {
            let mut pods = pods.lock().unwrap();
            if !pods.contains_key(&pod.id) {
                return Err(ApiError::not_found("pod", pod.id));
            }
            pods.insert(pod.id.clone(), pod.clone());
            Ok(Object::Pod(pod))
        }))
    }

    fn delete(&self, id: &str) -> Result<AsyncResult, ApiError> {
        let pods = Arc::clone(&self.pods);
        let id = id.to_string();
        Ok(make_async(async move {
            match pods.lock().unwrap().remove(&id) {
                Some(_) => Ok(Object::Status(Status::success())),
                None => Err(ApiError::not_found("pod", id)),
            }
        }))
    }

    fn as_watcher(&self) -> Option<&dyn ResourceWatcher> {
        if self.watchable { Some(self) } else { None }
    }
}

#[async_trait::async_trait]
impl ResourceWatcher for SimpleStorage {
    async fn watch(
        &self,
        label: Selector,
        field: Selector,
        resource_version: u64,
    ) -> Result<EventStream, ApiError> {
        *self.requested.lock().unwrap() = Some(WatchRequest {
            label: label.to_string(),
            field: field.to_string(),
            resource_version,
        });
        let subscription = self.broadcaster.watch(
            resource_version,
            Box::new(move |object: &Object| match object {
                Object::Pod(pod) => label.matches(&pod.labels) && field.matches(&pod.fields()),
                _ => true,
            }),
        );
        Ok(subscription.into_stream().boxed())
    }
}

/// Router serving `storage` as `foo` under [`PREFIX`].
pub fn router(storage: Arc<SimpleStorage>) -> Router {
    let mut map: HashMap<String, Arc<dyn RestStorage>> = HashMap::new();
    map.insert("foo".to_string(), storage);
    handle(map, Arc::new(JsonCodec), PREFIX)
}

/// Like [`router`], waiting at most `timeout` for mutation results.
pub fn router_with_timeout(storage: Arc<SimpleStorage>, timeout: Duration) -> Router {
    let mut map: HashMap<String, Arc<dyn RestStorage>> = HashMap::new();
    map.insert("foo".to_string(), storage);
    ApiServer::new(map, Arc::new(JsonCodec))
        .with_timeout(timeout)
        .router(PREFIX)
}

/// Serves `app` on a loopback port and returns `host:port`.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

pub fn pod(id: &str, name_label: &str) -> Pod {
    let mut labels = BTreeMap::new();
    labels.insert("name".to_string(), name_label.to_string());
    Pod {
        id: id.to_string(),
        labels,
        ..Default::default()
    }
}

/// Waits until `storage` has exactly `count` live watch subscriptions.
pub async fn wait_for_subscribers(storage: &SimpleStorage, count: usize) {
    for _ in 0..500 {
        if storage.broadcaster.subscriber_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {count} subscribers, have {}",
        storage.broadcaster.subscriber_count()
    );
}
