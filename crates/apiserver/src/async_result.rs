//! Single-shot result cells for asynchronous mutations
//!
//! A mutation hands back an [`AsyncResult`] as soon as its input has been
//! checked. The work itself runs on a spawned task that delivers exactly one
//! [`Object`]: the resulting resource, or a `Status` describing the failure.

use crate::error::ApiError;
use api::Object;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Receiving end of one asynchronous operation.
#[derive(Debug)]
pub struct AsyncResult {
    rx: oneshot::Receiver<Object>,
}

/// Runs `work` in the background and returns the cell its outcome lands in.
///
/// An error is rendered to a `Status` object, so the cell always yields an
/// object. The task never blocks on the reader; if the reader is gone the
/// outcome is dropped.
pub fn make_async<F>(work: F) -> AsyncResult
where
    F: Future<Output = Result<Object, ApiError>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let object = match work.await {
            Ok(object) => object,
            Err(err) => {
                debug!(error = %err, "async operation failed");
                Object::Status(err.to_status())
            }
        };
        if tx.send(object).is_err() {
            debug!("async result dropped before it was read");
        }
    });
    AsyncResult { rx }
}

impl AsyncResult {
    /// Waits for the outcome.
    pub async fn recv(self) -> Result<Object, ApiError> {
        self.rx.await.map_err(|_| {
            warn!("async operation ended without a result");
            ApiError::Internal("operation ended without a result".to_string())
        })
    }

    /// Waits for the outcome for at most `timeout`.
    pub async fn wait(self, timeout: Duration) -> Result<Object, ApiError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        }
    }
}
