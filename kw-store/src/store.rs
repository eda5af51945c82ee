use std::collections::BTreeMap;

use kw_core::prelude::*;
use kw_watch::{
    EventType,
    ResourceEvent,
};
use serde::Serialize;
use tracing::*;

/// Field order matters: the derived ordering is the order search results come back in.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResourceKey {
    pub namespace: String,
    pub kind: String,
    pub name: String,
    pub api_version: String,
}

impl ResourceKey {
    pub fn new(kind: &str, api_version: &str, namespace: &str, name: &str) -> ResourceKey {
        ResourceKey {
            namespace: namespace.into(),
            kind: kind.into(),
            name: name.into(),
            api_version: api_version.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResource {
    pub name: String,
    pub namespace: String,
    pub kind: String,
    pub api_version: String,
    pub resource_version: String,
    pub data: String,
}

impl StoredResource {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.kind, &self.api_version, &self.namespace, &self.name)
    }

    fn matches(&self, needle: &str) -> bool {
        [&self.name, &self.namespace, &self.kind]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

// The ResourceStore keeps the latest known state of every object the watchers have reported.
// It is purely in-memory and is rebuilt from scratch every time the process starts (the initial
// ADDED events from each watch repopulate it).
#[derive(Debug, Default)]
pub struct ResourceStore {
    resources: BTreeMap<ResourceKey, StoredResource>,
}

impl ResourceStore {
    pub fn new() -> ResourceStore {
        Default::default()
    }

    pub fn apply(&mut self, evt: &ResourceEvent) -> EmptyResult {
        match evt.event_type {
            EventType::Added | EventType::Modified => {
                let Some(obj) = &evt.object else {
                    warn!("{} event for {} has no payload, skipping", evt.event_type, evt.identity);
                    return Ok(());
                };

                self.upsert(StoredResource {
                    name: evt.identity.name.clone(),
                    namespace: evt.identity.namespace.clone(),
                    kind: evt.kind.kind().into(),
                    api_version: evt.kind.api_version(),
                    resource_version: evt.resource_version.clone(),
                    data: serde_json::to_string(obj)?,
                });
            },
            EventType::Deleted => {
                self.delete(&ResourceKey::new(
                    evt.kind.kind(),
                    &evt.kind.api_version(),
                    &evt.identity.namespace,
                    &evt.identity.name,
                ));
            },
            EventType::Error => (),
        }

        Ok(())
    }

    /// Insert or replace a resource.  Returns false if the write was dropped because we already
    /// have a newer version of the object.
    pub fn upsert(&mut self, resource: StoredResource) -> bool {
        let key = resource.key();
        if let Some(existing) = self.resources.get(&key)
            && is_older(&resource.resource_version, &existing.resource_version)
        {
            debug!(
                "ignoring stale write for {key:?}: {} < {}",
                resource.resource_version, existing.resource_version
            );
            return false;
        }

        self.resources.insert(key, resource);
        true
    }

    pub fn delete(&mut self, key: &ResourceKey) -> bool {
        self.resources.remove(key).is_some()
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&StoredResource> {
        self.resources.get(key)
    }

    /// Case-insensitive substring search over name, namespace and kind.  An empty query matches
    /// everything.  Results are ordered by (namespace, kind, name) and capped at
    /// SEARCH_RESULT_LIMIT.
    pub fn search(&self, query: &str) -> Vec<StoredResource> {
        let needle = query.to_lowercase();
        self.resources
            .values()
            .filter(|r| needle.is_empty() || r.matches(&needle))
            .take(SEARCH_RESULT_LIMIT)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.resources.len()
    }

    pub fn clear(&mut self) {
        self.resources.clear();
    }
}

// Resource versions are opaque strings, but in practice they're integers; when both sides parse
// we can refuse to go backwards, otherwise the last write wins.
fn is_older(incoming: &str, stored: &str) -> bool {
    match (incoming.parse::<u64>(), stored.parse::<u64>()) {
        (Ok(a), Ok(b)) => a < b,
        _ => false,
    }
}
