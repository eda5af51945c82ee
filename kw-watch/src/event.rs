use std::fmt;

use async_trait::async_trait;
use kw_core::prelude::*;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
    Error,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            EventType::Added => "ADDED",
            EventType::Modified => "MODIFIED",
            EventType::Deleted => "DELETED",
            EventType::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// The key of an object within one kind's collection.  Cluster-scoped objects have an empty
/// namespace.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Identity {
    pub namespace: String,
    pub name: String,
}

impl Identity {
    pub fn new(namespace: &str, name: &str) -> Identity {
        Identity { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Error details carried by a server-side error notification on an open watch (for example a
/// 410 Gone when the requested resource version is too old).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ServerError {
    pub code: u16,
    pub reason: String,
    pub message: String,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "unknown error event")
        } else {
            write!(f, "error event: {}", self.message)
        }
    }
}

impl std::error::Error for ServerError {}

/// A change notification exactly as it came off the wire, minus bookmarks.
#[derive(Clone, Debug)]
pub enum RawEvent {
    Added(DynamicObject),
    Modified(DynamicObject),
    Deleted(DynamicObject),
    Error(ServerError),
}

/// A normalized change event, tagged with the kind it belongs to and the identity of the object
/// that changed.
///
/// `previous_resource_version` is only set for `Modified` events; it is the empty string if this
/// watch loop never saw the object before (e.g., it restarted and missed the `Added`).  `object`
/// is `None` only for `Error` events, and `error` is `Some` only for `Error` events.
#[derive(Clone, Debug)]
pub struct ResourceEvent {
    pub event_type: EventType,
    pub kind: ResourceKind,
    pub identity: Identity,
    pub resource_version: String,
    pub previous_resource_version: Option<String>,
    pub object: Option<DynamicObject>,
    pub error: Option<ServerError>,
}

/// Receives every normalized event from every watch loop.  The loop awaits `handle` before
/// reading the next event off its stream, so a slow handler slows ingestion down for that kind;
/// handlers that need more concurrency than that should hand the event off internally.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: ResourceEvent);
}

/// Adapts a plain closure into an [`EventHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(ResourceEvent) + Send + Sync,
{
    async fn handle(&self, event: ResourceEvent) {
        (self.0)(event)
    }
}
