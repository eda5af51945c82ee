use std::sync::Arc;

use async_trait::async_trait;
use kw_watch::{
    EventHandler,
    ResourceEvent,
};
use tokio::sync::{
    Mutex,
    MutexGuard,
};
use tracing::*;

use crate::store::{
    ResourceStore,
    StoredResource,
};

/// A [`ResourceStore`] behind an async mutex, so every watch loop can write to it and readers
/// can query it while the watchers are running.
#[derive(Clone, Default)]
pub struct SharedStore(Arc<Mutex<ResourceStore>>);

impl SharedStore {
    pub fn new() -> SharedStore {
        Default::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, ResourceStore> {
        self.0.lock().await
    }

    pub async fn count(&self) -> usize {
        self.0.lock().await.count()
    }

    pub async fn search(&self, query: &str) -> Vec<StoredResource> {
        self.0.lock().await.search(query)
    }
}

#[async_trait]
impl EventHandler for SharedStore {
    async fn handle(&self, event: ResourceEvent) {
        let mut store = self.0.lock().await;
        if let Err(err) = store.apply(&event) {
            error!("could not store {} event for {} {}: {err}", event.event_type, event.kind, event.identity);
        }
    }
}
