//! Watch over both transports, parameter parsing and protocol selection

mod common;

use api::{decode_watch_event, JsonCodec, Object};
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use common::{pod, router, serve, wait_for_subscribers, SimpleStorage, PREFIX};
use futures::StreamExt;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;
use watch::EventType;

fn watch_table() -> Vec<(EventType, Object)> {
    vec![
        (EventType::Added, Object::Pod(pod("a-name", "foo"))),
        (EventType::Modified, Object::Pod(pod("another-name", "foo"))),
        (EventType::Deleted, Object::Pod(pod("another-name", "foo"))),
    ]
}

#[tokio::test]
async fn test_watch_websocket() {
    let storage = Arc::new(SimpleStorage::new());
    let addr = serve(router(Arc::clone(&storage))).await;

    let url = format!("ws://{addr}{PREFIX}/watch/foo");
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    for (kind, object) in watch_table() {
        storage.broadcaster.action(kind, object.clone()).await.unwrap();
        let text = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => text,
            other => panic!("unexpected message {other:?}"),
        };
        let event = decode_watch_event(&JsonCodec, text.as_str()).unwrap();
        assert_eq!(event.kind, kind);
        assert_eq!(event.object, object);
    }

    storage.broadcaster.shutdown().await;
    if let Some(Ok(Message::Text(text))) = ws.next().await {
        panic!("unexpected event after stop: {}", text.as_str());
    }
}

/// Reads one newline-terminated frame, or `None` once the body has ended.
async fn next_line<S>(body: &mut S, buffer: &mut Vec<u8>) -> Option<String>
where
    S: futures::Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    loop {
        if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            return Some(String::from_utf8(line).unwrap());
        }
        match body.next().await {
            Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
            Some(Err(err)) => panic!("body error: {err}"),
            None => return None,
        }
    }
}

#[tokio::test]
async fn test_watch_http() {
    let storage = Arc::new(SimpleStorage::new());
    let addr = serve(router(Arc::clone(&storage))).await;

    let url = format!("http://{addr}{PREFIX}/watch/foo");
    let request = tokio::spawn(reqwest::get(url));
    wait_for_subscribers(&storage, 1).await;

    let mut table = watch_table().into_iter();
    let (kind, object) = table.next().unwrap();
    storage.broadcaster.action(kind, object.clone()).await.unwrap();

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let mut body = response.bytes_stream();
    let mut buffer = Vec::new();

    let line = next_line(&mut body, &mut buffer).await.unwrap();
    let event = decode_watch_event(&JsonCodec, line.trim_end()).unwrap();
    assert_eq!((event.kind, event.object), (kind, object));

    for (kind, object) in table {
        storage.broadcaster.action(kind, object.clone()).await.unwrap();
        let line = next_line(&mut body, &mut buffer).await.unwrap();
        let event = decode_watch_event(&JsonCodec, line.trim_end()).unwrap();
        assert_eq!(event.kind, kind);
        assert_eq!(event.object, object);
    }

    storage.broadcaster.shutdown().await;
    assert_eq!(next_line(&mut body, &mut buffer).await, None);
}

#[tokio::test]
async fn test_watch_filters_by_label() {
    let storage = Arc::new(SimpleStorage::new());
    let app = router(Arc::clone(&storage));

    let response = app
        .oneshot(
            Request::get(format!("{PREFIX}/watch/foo?labels=name%3Dfoo"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    storage
        .broadcaster
        .action(EventType::Added, Object::Pod(pod("skipped", "bar")))
        .await
        .unwrap();
    storage
        .broadcaster
        .action(EventType::Added, Object::Pod(pod("kept", "foo")))
        .await
        .unwrap();
    storage.broadcaster.shutdown().await;

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let events: Vec<_> = text
        .lines()
        .map(|line| decode_watch_event(&JsonCodec, line).unwrap())
        .collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].object.id(), "kept");
}

#[tokio::test]
async fn test_watch_param_parsing() {
    let storage = Arc::new(SimpleStorage::new());
    let app = router(Arc::clone(&storage));

    let table = [
        ("resourceVersion=1234", 1234, "", ""),
        (
            "resourceVersion=314159&fields=Host%3D&labels=name%3Dfoo",
            314159,
            "name=foo",
            "Host=",
        ),
        ("fields=ID%3dfoo&resourceVersion=1492", 1492, "", "ID=foo"),
        ("", 0, "", ""),
    ];

    for (raw_query, resource_version, label, field) in table {
        *storage.requested.lock().unwrap() = None;
        let uri = format!("{PREFIX}/watch/foo?{raw_query}");
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{raw_query}");
        drop(response);

        let requested = storage.requested().unwrap();
        assert_eq!(requested.resource_version, resource_version, "{raw_query}");
        assert_eq!(requested.label, label, "{raw_query}");
        assert_eq!(requested.field, field, "{raw_query}");
    }
}

#[tokio::test]
async fn test_watch_rejects_bad_params() {
    let storage = Arc::new(SimpleStorage::new());
    let app = router(Arc::clone(&storage));

    for raw_query in ["resourceVersion=abc", "labels=%3Dfoo", "fields=Host"] {
        let response = app
            .clone()
            .oneshot(
                Request::get(format!("{PREFIX}/watch/foo?{raw_query}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{raw_query}");
    }
    assert!(storage.requested().is_none());
}

#[tokio::test]
async fn test_watch_protocol_selection() {
    let storage = Arc::new(SimpleStorage::new());
    let addr = serve(router(Arc::clone(&storage))).await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}{PREFIX}/watch/foo");

    // Upgrade attempts lack the Sec-WebSocket-* headers and fail the handshake.
    let table = [
        (true, "Upgrade"),
        (true, "keep-alive, Upgrade"),
        (true, "upgrade"),
        (false, "keep-alive"),
    ];

    for (is_websocket, connection) in table {
        let request = client
            .get(&url)
            .header("Connection", connection)
            .header("Upgrade", "websocket")
            .send();
        let response = if is_websocket {
            request.await.unwrap()
        } else {
            let pending = tokio::spawn(request);
            wait_for_subscribers(&storage, 1).await;
            storage
                .broadcaster
                .action(EventType::Added, Object::Pod(pod("x", "foo")))
                .await
                .unwrap();
            pending.await.unwrap().unwrap()
        };

        let expected = if is_websocket {
            reqwest::StatusCode::BAD_REQUEST
        } else {
            reqwest::StatusCode::OK
        };
        assert_eq!(response.status(), expected, "Connection: {connection}");
    }
}

#[tokio::test]
async fn test_watch_unsupported_resource() {
    let mut plain = SimpleStorage::new();
    plain.watchable = false;
    let app = router(Arc::new(plain));

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("{PREFIX}/watch/foo"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app
        .oneshot(
            Request::get(format!("{PREFIX}/watch/bar"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_disconnect_releases_subscription() {
    let storage = Arc::new(SimpleStorage::new());
    let app = router(Arc::clone(&storage));

    let response = app
        .oneshot(
            Request::get(format!("{PREFIX}/watch/foo"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(storage.broadcaster.subscriber_count(), 1);

    drop(response);
    assert_eq!(storage.broadcaster.subscriber_count(), 0);
}
