//! Pods and minions served over HTTP from the in-memory registry

use api::{decode_watch_event, Codec, JsonCodec, Minion, Object, PodPhase, StatusReason};
use apiserver::{handle, RestStorage};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use registry::{MemoryRegistry, MinionRegistry, MinionStorage, PodStorage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use watch::EventType;

const PREFIX: &str = "/api/v1beta1";

async fn setup() -> (Arc<MemoryRegistry>, Router) {
    let registry = Arc::new(MemoryRegistry::new(10));
    registry
        .create_minion(Minion {
            id: "machine".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let pods = PodStorage::new(Arc::clone(&registry) as _)
        .with_minions(Arc::clone(&registry) as _)
        .with_polling(Duration::from_millis(10), Duration::from_millis(50));
    let minions = MinionStorage::new(Arc::clone(&registry) as _);

    let mut storage: HashMap<String, Arc<dyn RestStorage>> = HashMap::new();
    storage.insert("pods".to_string(), Arc::new(pods));
    storage.insert("minions".to_string(), Arc::new(minions));
    (registry, handle(storage, Arc::new(JsonCodec), PREFIX))
}

async fn call(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Object) {
    let request = Request::builder()
        .method(method)
        .uri(format!("{PREFIX}{uri}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, JsonCodec.decode(&bytes).unwrap())
}

const POD: &str = r#"{
    "kind": "Pod",
    "apiVersion": "v1beta1",
    "labels": {"name": "foo"},
    "desiredState": {
        "host": "machine",
        "manifest": {
            "version": "v1beta1",
            "containers": [{"name": "web", "image": "nginx"}]
        }
    }
}"#;

#[tokio::test]
async fn test_pod_lifecycle() {
    let (_registry, app) = setup().await;

    let (status, object) = call(&app, Method::POST, "/pods", POD).await;
    assert_eq!(status, StatusCode::OK);
    let created = object.into_pod().unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(created.desired_state.manifest.id, created.id);
    assert!(created.resource_version > 0);
    assert_eq!(created.current_state.status, Some(PodPhase::Waiting));

    let (status, object) = call(&app, Method::GET, &format!("/pods/{}", created.id), "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(object.id(), created.id);

    let (_, object) = call(&app, Method::GET, "/pods?fields=DesiredState.Host%3Dmachine", "").await;
    let Object::PodList(list) = object else {
        panic!("expected a pod list");
    };
    assert_eq!(list.items.len(), 1);

    let (_, object) = call(&app, Method::GET, "/pods?labels=name%3Dbar", "").await;
    let Object::PodList(list) = object else {
        panic!("expected a pod list");
    };
    assert!(list.items.is_empty());

    let (status, _) = call(&app, Method::DELETE, &format!("/pods/{}", created.id), "").await;
    assert_eq!(status, StatusCode::OK);
    let (status, object) = call(&app, Method::GET, &format!("/pods/{}", created.id), "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(object.as_status().unwrap().reason, Some(StatusReason::NotFound));
}

#[tokio::test]
async fn test_invalid_pod_is_not_stored() {
    let (_registry, app) = setup().await;

    let (status, object) = call(&app, Method::POST, "/pods", r#"{"id":"foo"}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(object.as_status().unwrap().reason, Some(StatusReason::Invalid));

    let (_, object) = call(&app, Method::GET, "/pods", "").await;
    let Object::PodList(list) = object else {
        panic!("expected a pod list");
    };
    assert!(list.items.is_empty());
}

#[tokio::test]
async fn test_watch_pods() {
    let (registry, app) = setup().await;

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("{PREFIX}/watch/pods?labels=name%3Dfoo"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, object) = call(&app, Method::POST, "/pods", POD).await;
    let id = object.id().to_string();
    call(&app, Method::DELETE, &format!("/pods/{id}"), "").await;
    registry.shutdown().await;

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let events: Vec<_> = text
        .lines()
        .map(|line| decode_watch_event(&JsonCodec, line).unwrap())
        .collect();
    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventType::Added, EventType::Deleted]);
    assert!(events.iter().all(|e| e.object.id() == id));
}

#[tokio::test]
async fn test_minions() {
    let (_registry, app) = setup().await;

    let (_, object) = call(&app, Method::GET, "/minions", "").await;
    let Object::MinionList(list) = object else {
        panic!("expected a minion list");
    };
    assert_eq!(list.items.len(), 1);

    let (status, _) = call(&app, Method::POST, "/minions", r#"{"id":"machine2"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::POST, "/minions", r#"{"id":"machine2"}"#).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let response = app
        .oneshot(
            Request::get(format!("{PREFIX}/watch/minions"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
