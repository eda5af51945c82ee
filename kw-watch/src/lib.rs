#![cfg_attr(coverage, feature(coverage_attribute))]
mod cluster;
mod config;
mod discovery;
mod errors;
mod event;
mod kind_watcher;
mod normalizer;
mod supervisor;

pub use crate::cluster::{
    ApiCatalog,
    ClusterApi,
    KubeClusterApi,
    RawEventStream,
};
#[cfg(feature = "mock")]
pub use crate::cluster::MockClusterApi;
pub use crate::config::{
    KindEntry,
    WatcherConfig,
};
pub use crate::discovery::{
    discover_watchable,
    resolve_kind,
    watchable_kinds,
};
pub use crate::errors::WatchError;
pub use crate::event::{
    EventHandler,
    EventType,
    FnHandler,
    Identity,
    RawEvent,
    ResourceEvent,
    ServerError,
};
pub use crate::kind_watcher::{
    KindWatcher,
    LoopExit,
    SubscriptionState,
};
pub use crate::normalizer::{
    Normalizer,
    VersionCache,
};
pub use crate::supervisor::WatchSupervisor;

#[cfg(test)]
mod tests;
