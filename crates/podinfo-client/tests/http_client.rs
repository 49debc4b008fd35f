//! HttpPodInfoGetter against a loopback container-host agent

use api::{ContainerInfo, ContainerState, NetworkSettings, PodInfo};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use podinfo_client::{HttpPodInfoGetter, PodInfoError, PodInfoGetter};
use std::collections::HashMap;

fn sample_info() -> PodInfo {
    let mut info = PodInfo::new();
    info.insert(
        "net".to_string(),
        ContainerInfo {
            id: "c0".to_string(),
            path: "/pause".to_string(),
            state: ContainerState { running: true },
            network_settings: Some(NetworkSettings {
                ip_address: "10.244.1.7".to_string(),
            }),
        },
    );
    info
}

async fn pod_info(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PodInfo>, StatusCode> {
    match params.get("podID").map(String::as_str) {
        Some("web 1") => Ok(Json(sample_info())),
        Some("broken") => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn start_agent() -> u16 {
    let app = Router::new().route("/podInfo", get(pod_info));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

#[tokio::test]
async fn fetches_and_decodes_pod_info() {
    let port = start_agent().await;
    let getter = HttpPodInfoGetter::new(port).unwrap();

    let info = getter.get_pod_info("127.0.0.1", "web 1").await.unwrap();
    assert_eq!(info, sample_info());
    assert_eq!(info["net"].ip_address(), Some("10.244.1.7"));
}

#[tokio::test]
async fn unknown_pod_is_not_found() {
    let port = start_agent().await;
    let getter = HttpPodInfoGetter::new(port).unwrap();

    let err = getter.get_pod_info("127.0.0.1", "missing").await.unwrap_err();
    assert!(matches!(err, PodInfoError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let port = start_agent().await;
    let getter = HttpPodInfoGetter::new(port).unwrap();

    let err = getter.get_pod_info("127.0.0.1", "broken").await.unwrap_err();
    assert!(matches!(err, PodInfoError::Api { status: 500, .. }), "got {err:?}");
}
