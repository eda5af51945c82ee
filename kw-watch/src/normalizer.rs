use std::collections::HashMap;

use kw_core::prelude::*;

use crate::event::{
    EventType,
    Identity,
    RawEvent,
    ResourceEvent,
};

/// Last resource version observed for every live object in one kind's collection.  An entry
/// exists iff the most recent event this loop saw for that identity was an Added or Modified.
#[derive(Debug, Default)]
pub struct VersionCache(HashMap<Identity, String>);

impl VersionCache {
    pub fn get(&self, id: &Identity) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &Identity) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// The Normalizer is owned by exactly one watch loop, so the cache never needs a lock.
pub struct Normalizer {
    kind: ResourceKind,
    cache: VersionCache,
}

impl Normalizer {
    pub fn new(kind: ResourceKind) -> Normalizer {
        Normalizer { kind, cache: VersionCache::default() }
    }

    pub fn cache(&self) -> &VersionCache {
        &self.cache
    }

    pub fn normalize(&mut self, raw: RawEvent) -> ResourceEvent {
        match raw {
            RawEvent::Added(obj) => {
                let (identity, rv) = identify(&obj);
                self.cache.0.insert(identity.clone(), rv.clone());
                self.event_for(EventType::Added, identity, rv, None, obj)
            },
            RawEvent::Modified(obj) => {
                let (identity, rv) = identify(&obj);
                let prev = self.cache.0.insert(identity.clone(), rv.clone()).unwrap_or_default();
                self.event_for(EventType::Modified, identity, rv, Some(prev), obj)
            },
            RawEvent::Deleted(obj) => {
                let (identity, rv) = identify(&obj);
                self.cache.0.remove(&identity);
                self.event_for(EventType::Deleted, identity, rv, None, obj)
            },
            RawEvent::Error(err) => ResourceEvent {
                event_type: EventType::Error,
                kind: self.kind.clone(),
                identity: Identity::default(),
                resource_version: String::new(),
                previous_resource_version: None,
                object: None,
                error: Some(err),
            },
        }
    }

    fn event_for(
        &self,
        event_type: EventType,
        identity: Identity,
        resource_version: String,
        previous_resource_version: Option<String>,
        obj: DynamicObject,
    ) -> ResourceEvent {
        ResourceEvent {
            event_type,
            kind: self.kind.clone(),
            identity,
            resource_version,
            previous_resource_version,
            object: Some(obj),
            error: None,
        }
    }
}

// Missing metadata shouldn't stop the stream, so anything absent just becomes "".
fn identify(obj: &DynamicObject) -> (Identity, String) {
    let identity = Identity {
        namespace: obj.metadata.namespace.clone().unwrap_or_default(),
        name: obj.metadata.name.clone().unwrap_or_default(),
    };
    (identity, obj.metadata.resource_version.clone().unwrap_or_default())
}
