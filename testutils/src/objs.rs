use kw_core::prelude::*;
use rstest::fixture;
use serde_json::json;

use crate::constants::*;

#[fixture]
pub fn test_deployment(#[default(TEST_DEPLOYMENT)] name: &str) -> DynamicObject {
    let mut obj = DynamicObject::new(name, &DEPL_KIND.api_resource())
        .within(TEST_NAMESPACE)
        .data(json!({"spec": {"replicas": 42}}));
    obj.metadata.resource_version = Some(TEST_RESOURCE_VERSION.into());
    obj
}

#[fixture]
pub fn test_pod(#[default(TEST_POD)] name: &str) -> DynamicObject {
    let mut obj = DynamicObject::new(name, &POD_RESOURCE_KIND.api_resource())
        .within(TEST_NAMESPACE)
        .data(json!({"spec": {"containers": [{"name": "nginx", "image": "nginx:latest"}]}}));
    obj.metadata.resource_version = Some(TEST_RESOURCE_VERSION.into());
    obj
}

// Same object at a different resource version, for exercising MODIFIED handling.
pub fn with_resource_version(mut obj: DynamicObject, rv: &str) -> DynamicObject {
    obj.metadata.resource_version = Some(rv.into());
    obj
}

// One line of a watch response body, the way the apiserver frames it.
pub fn watch_line(event_type: &str, obj: &DynamicObject) -> String {
    json!({"type": event_type, "object": obj}).to_string()
}
