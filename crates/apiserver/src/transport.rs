//! Watch transports
//!
//! A watch request is served either over a WebSocket or as a long-lived HTTP
//! response. The choice is made from the request headers alone: a request
//! announcing a WebSocket upgrade is held to the full handshake and rejected
//! with 400 if it is incomplete; anything else gets a streamed 200 response.
//! Both transports carry the same framing, one JSON watch event per message
//! (or per line).

use crate::error::ApiError;
use crate::rest::EventStream;
use api::{encode_watch_event, Codec};
use axum::body::{Body, Bytes};
use axum::extract::ws::{Message, WebSocket};
use axum::http::header::{CONNECTION, CONTENT_TYPE, UPGRADE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use labels::Selector;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

/// Query parameter carrying the resume version
pub const RESOURCE_VERSION_PARAM: &str = "resourceVersion";
/// Query parameter carrying the label selector
pub const LABELS_PARAM: &str = "labels";
/// Query parameter carrying the field selector
pub const FIELDS_PARAM: &str = "fields";

/// True if the headers ask for a WebSocket: `Upgrade` mentions `websocket`
/// and `Connection` lists an `upgrade` token, both case-insensitively.
pub fn is_websocket_request(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get_all(UPGRADE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.to_ascii_lowercase().contains("websocket"));
    let connection = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    upgrade && connection
}

/// Parameters of a watch or list request.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchParams {
    pub resource_version: u64,
    pub label: Selector,
    pub field: Selector,
}

impl WatchParams {
    /// Reads `resourceVersion`, `labels` and `fields` from decoded query
    /// parameters. Absent values default to 0 and match-everything.
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ApiError> {
        let resource_version = match query.get(RESOURCE_VERSION_PARAM) {
            None => 0,
            Some(raw) if raw.is_empty() => 0,
            Some(raw) => raw.parse().map_err(|_| {
                ApiError::BadRequest(format!("invalid {RESOURCE_VERSION_PARAM} {raw:?}"))
            })?,
        };
        let label = match query.get(LABELS_PARAM) {
            Some(text) => Selector::parse(text)?,
            None => Selector::everything(),
        };
        let field = match query.get(FIELDS_PARAM) {
            Some(text) => Selector::parse_fields(text)?,
            None => Selector::everything(),
        };
        Ok(Self {
            resource_version,
            label,
            field,
        })
    }
}

/// Pushes `events` over an upgraded socket until the stream ends or the
/// peer goes away.
pub async fn serve_websocket(mut socket: WebSocket, mut events: EventStream, codec: Arc<dyn Codec>) {
    loop {
        tokio::select! {
            next = events.next() => {
                let Some(event) = next else {
                    debug!("watch feed ended, closing websocket");
                    break;
                };
                let text = match encode_watch_event(codec.as_ref(), &event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "dropping unencodable watch event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    debug!("websocket peer went away");
                    return;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
                        debug!("websocket closed by peer");
                        return;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    if let Err(err) = socket.send(Message::Close(None)).await {
        debug!(error = %err, "websocket close frame not sent");
    }
}

/// A 200 response whose body carries one JSON watch event per line and ends
/// when `events` does.
pub fn http_stream_response(events: EventStream, codec: Arc<dyn Codec>) -> Response {
    let body = events.filter_map(move |event| {
        let line = match encode_watch_event(codec.as_ref(), &event) {
            Ok(mut text) => {
                text.push('\n');
                Some(Ok::<_, Infallible>(Bytes::from(text)))
            }
            Err(err) => {
                warn!(error = %err, "dropping unencodable watch event");
                None
            }
        };
        futures::future::ready(line)
    });

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
