//! API server core
//!
//! Serves resource collections implementing [`RestStorage`] over HTTP:
//! list/get/create/update/delete, plus watch over a WebSocket or a streamed
//! HTTP response for collections that also implement [`ResourceWatcher`].
//!
//! # Example
//!
//! ```no_run
//! use apiserver::{ApiServer, RestStorage, ServerConfig};
//! use api::JsonCodec;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let storage: HashMap<String, Arc<dyn RestStorage>> = HashMap::new();
//! let app = ApiServer::new(storage, Arc::new(JsonCodec))
//!     .with_timeout(config.request_timeout)
//!     .router(&config.prefix);
//! let listener = tokio::net::TcpListener::bind(config.addr).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod async_result;
pub mod config;
pub mod error;
pub mod handlers;
pub mod rest;
pub mod transport;

pub use async_result::{make_async, AsyncResult};
pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use handlers::{handle, object_response, ApiServer};
pub use rest::{EventStream, ResourceWatcher, RestStorage};
pub use transport::{is_websocket_request, WatchParams};
