//! HTTP routing
//!
//! Routes, relative to the configured prefix:
//!
//! | method | path | operation |
//! |---|---|---|
//! | GET | `/{resource}` | list, filtered by `labels` and `fields` |
//! | POST | `/{resource}` | create |
//! | GET | `/{resource}/{id}` | get |
//! | PUT | `/{resource}/{id}` | update |
//! | DELETE | `/{resource}/{id}` | delete |
//! | GET | `/watch/{resource}` | watch, over WebSocket or a streamed response |
//!
//! Mutations wait up to the server's timeout (or `?timeout=<secs>`) for their
//! result and answer 202 with a `working` status when it is not ready.

use crate::async_result::AsyncResult;
use crate::error::ApiError;
use crate::rest::RestStorage;
use crate::transport::{http_stream_response, is_websocket_request, serve_websocket, WatchParams};
use api::{Codec, JsonCodec, Object};
use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Query parameter overriding the mutation wait
pub const TIMEOUT_PARAM: &str = "timeout";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Encodes `object` as the body of a response with the given status code.
pub fn object_response(code: StatusCode, object: &Object) -> Response {
    encode_response(&JsonCodec, code, object)
}

fn encode_response(codec: &dyn Codec, code: StatusCode, object: &Object) -> Response {
    match codec.encode(object) {
        Ok(body) => {
            let mut response = (code, body).into_response();
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            error!(error = %err, kind = object.kind(), "failed to encode response");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

/// The resource collections served under one prefix.
pub struct ApiServer {
    storage: HashMap<String, Arc<dyn RestStorage>>,
    codec: Arc<dyn Codec>,
    timeout: Duration,
}

impl ApiServer {
    pub fn new(storage: HashMap<String, Arc<dyn RestStorage>>, codec: Arc<dyn Codec>) -> Self {
        Self {
            storage,
            codec,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets how long mutations wait for their result by default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the router serving every collection under `prefix`.
    pub fn router(self, prefix: &str) -> Router {
        let api = Router::new()
            .route("/watch/{resource}", get(watch_resource))
            .route("/{resource}", get(list_resource).post(create_resource))
            .route(
                "/{resource}/{id}",
                get(get_resource).put(update_resource).delete(delete_resource),
            )
            .with_state(Arc::new(self));

        let prefix = prefix.trim_end_matches('/');
        let router = if prefix.is_empty() {
            api
        } else {
            Router::new().nest(prefix, api)
        };
        router.layer(TraceLayer::new_for_http())
    }

    fn storage(&self, resource: &str) -> Result<Arc<dyn RestStorage>, ApiError> {
        self.storage
            .get(resource)
            .cloned()
            .ok_or_else(|| ApiError::not_found("resource", resource))
    }

    fn respond(&self, code: StatusCode, object: &Object) -> Response {
        encode_response(self.codec.as_ref(), code, object)
    }

    fn decode(&self, storage: &dyn RestStorage, body: &Bytes) -> Result<Object, ApiError> {
        let kind = storage.new_object().kind();
        Ok(self.codec.decode_as(body, kind)?)
    }

    fn timeout(&self, query: &HashMap<String, String>) -> Result<Duration, ApiError> {
        match query.get(TIMEOUT_PARAM) {
            None => Ok(self.timeout),
            Some(raw) => raw
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ApiError::BadRequest(format!("invalid {TIMEOUT_PARAM} {raw:?}"))),
        }
    }

    async fn finish(&self, result: AsyncResult, timeout: Duration) -> Result<Response, ApiError> {
        let object = result.wait(timeout).await?;
        let code = match &object {
            Object::Status(status) => {
                StatusCode::from_u16(status.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => StatusCode::OK,
        };
        Ok(self.respond(code, &object))
    }
}

impl fmt::Debug for ApiServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resources: Vec<_> = self.storage.keys().collect();
        resources.sort();
        f.debug_struct("ApiServer")
            .field("resources", &resources)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Router serving `storage` under `prefix` with the default timeout.
pub fn handle(
    storage: HashMap<String, Arc<dyn RestStorage>>,
    codec: Arc<dyn Codec>,
    prefix: &str,
) -> Router {
    ApiServer::new(storage, codec).router(prefix)
}

type Server = State<Arc<ApiServer>>;
type Params = Query<HashMap<String, String>>;

async fn list_resource(
    State(server): Server,
    Path(resource): Path<String>,
    Query(query): Params,
) -> Result<Response, ApiError> {
    let storage = server.storage(&resource)?;
    let params = WatchParams::from_query(&query)?;
    let list = storage.list(&params.label, &params.field).await?;
    Ok(server.respond(StatusCode::OK, &list))
}

async fn get_resource(
    State(server): Server,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let storage = server.storage(&resource)?;
    let object = storage.get(&id).await?;
    Ok(server.respond(StatusCode::OK, &object))
}

async fn create_resource(
    State(server): Server,
    Path(resource): Path<String>,
    Query(query): Params,
    body: Bytes,
) -> Result<Response, ApiError> {
    let storage = server.storage(&resource)?;
    let timeout = server.timeout(&query)?;
    let object = server.decode(storage.as_ref(), &body)?;
    let result = storage.create(object)?;
    server.finish(result, timeout).await
}

async fn update_resource(
    State(server): Server,
    Path((resource, id)): Path<(String, String)>,
    Query(query): Params,
    body: Bytes,
) -> Result<Response, ApiError> {
    let storage = server.storage(&resource)?;
    let timeout = server.timeout(&query)?;
    let mut object = server.decode(storage.as_ref(), &body)?;
    if object.id().is_empty() {
        object.set_id(id.as_str());
    } else if object.id() != id {
        return Err(ApiError::BadRequest(format!(
            "id {:?} in body does not match {id:?} in path",
            object.id()
        )));
    }
    let result = storage.update(object)?;
    server.finish(result, timeout).await
}

async fn delete_resource(
    State(server): Server,
    Path((resource, id)): Path<(String, String)>,
    Query(query): Params,
) -> Result<Response, ApiError> {
    let storage = server.storage(&resource)?;
    let timeout = server.timeout(&query)?;
    let result = storage.delete(&id)?;
    server.finish(result, timeout).await
}

async fn watch_resource(
    State(server): Server,
    Path(resource): Path<String>,
    Query(query): Params,
    request: Request,
) -> Result<Response, ApiError> {
    let storage = server.storage(&resource)?;
    let watcher = storage
        .as_watcher()
        .ok_or_else(|| ApiError::MethodNotAllowed(format!("{resource} cannot be watched")))?;
    let params = WatchParams::from_query(&query)?;

    let (mut parts, _body) = request.into_parts();
    if is_websocket_request(&parts.headers) {
        let upgrade = WebSocketUpgrade::from_request_parts(&mut parts, &())
            .await
            .map_err(|rejection| {
                debug!(%resource, reason = %rejection.body_text(), "websocket handshake rejected");
                ApiError::BadRequest(rejection.body_text())
            })?;
        let events = watcher
            .watch(params.label, params.field, params.resource_version)
            .await?;
        info!(%resource, resource_version = params.resource_version, "websocket watch started");
        let codec = Arc::clone(&server.codec);
        return Ok(upgrade.on_upgrade(move |socket| serve_websocket(socket, events, codec)));
    }

    let events = watcher
        .watch(params.label, params.field, params.resource_version)
        .await?;
    info!(%resource, resource_version = params.resource_version, "streaming watch started");
    Ok(http_stream_response(events, Arc::clone(&server.codec)))
}
