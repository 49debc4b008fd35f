//! Minion REST storage

use crate::traits::MinionRegistry;
use api::validation::validate_minion;
use api::{FieldSource, Minion, Object, Status};
use apiserver::{make_async, ApiError, AsyncResult, RestStorage};
use async_trait::async_trait;
use labels::{Selector, Set};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// REST storage for minions. Minions cannot be updated or watched.
#[derive(Clone)]
pub struct MinionStorage {
    registry: Arc<dyn MinionRegistry>,
}

impl MinionStorage {
    pub fn new(registry: Arc<dyn MinionRegistry>) -> Self {
        Self { registry }
    }
}

impl fmt::Debug for MinionStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinionStorage").finish_non_exhaustive()
    }
}

#[async_trait]
impl RestStorage for MinionStorage {
    fn new_object(&self) -> Object {
        Object::Minion(Minion::default())
    }

    async fn list(&self, label: &Selector, field: &Selector) -> Result<Object, ApiError> {
        let mut list = self.registry.list_minions().await?;
        // minions carry no labels
        let labels = Set::new();
        list.items
            .retain(|minion| label.matches(&labels) && field.matches(&minion.fields()));
        Ok(Object::MinionList(list))
    }

    async fn get(&self, id: &str) -> Result<Object, ApiError> {
        Ok(Object::Minion(self.registry.get_minion(id).await?))
    }

    fn create(&self, object: Object) -> Result<AsyncResult, ApiError> {
        let kind = object.kind();
        let minion = object
            .into_minion()
            .ok_or_else(|| ApiError::BadRequest(format!("expected a Minion, got {kind}")))?;
        let errors = validate_minion(&minion);
        if !errors.is_empty() {
            return Err(ApiError::invalid("minion", minion.id, errors));
        }

        info!(id = %minion.id, "registering minion");
        let registry = Arc::clone(&self.registry);
        Ok(make_async(async move {
            Ok(Object::Minion(registry.create_minion(minion).await?))
        }))
    }

    fn update(&self, _object: Object) -> Result<AsyncResult, ApiError> {
        Err(ApiError::MethodNotAllowed(
            "minions cannot be updated".to_string(),
        ))
    }

    fn delete(&self, id: &str) -> Result<AsyncResult, ApiError> {
        info!(%id, "removing minion");
        let registry = Arc::clone(&self.registry);
        let id = id.to_string();
        Ok(make_async(async move {
            registry.delete_minion(&id).await?;
            Ok(Object::Status(Status::success()))
        }))
    }
}
