#![cfg_attr(coverage, feature(coverage_attribute))]
mod handler;
mod store;

pub use crate::handler::SharedStore;
pub use crate::store::{
    ResourceKey,
    ResourceStore,
    StoredResource,
};

#[cfg(test)]
mod tests;
