//! REST storage surface
//!
//! Every resource collection served by the API server implements
//! [`RestStorage`]. Collections that can stream changes also implement
//! [`ResourceWatcher`] and expose it through [`RestStorage::as_watcher`].

use crate::async_result::AsyncResult;
use crate::error::ApiError;
use api::Object;
use futures::stream::BoxStream;
use labels::Selector;
use watch::Event;

/// Stream of change events for one watch request
pub type EventStream = BoxStream<'static, Event<Object>>;

/// One resource collection
///
/// `create`, `update` and `delete` check their input synchronously and fail
/// without side effects when it is rejected. Otherwise the work continues in
/// the background and its outcome arrives through the returned
/// [`AsyncResult`]. They must be called within a Tokio runtime.
#[async_trait::async_trait]
pub trait RestStorage: Send + Sync {
    /// An empty object of the kind this collection stores.
    fn new_object(&self) -> Object;

    /// Objects matching both selectors.
    async fn list(&self, label: &Selector, field: &Selector) -> Result<Object, ApiError>;

    async fn get(&self, id: &str) -> Result<Object, ApiError>;

    fn create(&self, object: Object) -> Result<AsyncResult, ApiError>;

    fn update(&self, object: Object) -> Result<AsyncResult, ApiError>;

    fn delete(&self, id: &str) -> Result<AsyncResult, ApiError>;

    /// The collection's watch capability, if it has one.
    fn as_watcher(&self) -> Option<&dyn ResourceWatcher> {
        None
    }
}

/// Collections that can stream their changes
#[async_trait::async_trait]
pub trait ResourceWatcher: Send + Sync {
    /// Streams changes to objects matching both selectors, starting at
    /// `resource_version` (0 means from now on).
    async fn watch(
        &self,
        label: Selector,
        field: Selector,
        resource_version: u64,
    ) -> Result<EventStream, ApiError>;
}
