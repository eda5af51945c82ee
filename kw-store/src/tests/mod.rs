
use kw_core::prelude::*;
use kw_testutils::*;
use kw_watch::{
    EventHandler,
    EventType,
    Identity,
    ResourceEvent,
    ServerError,
};
use rstest::*;

use super::*;

fn event_for(event_type: EventType, kind: &ResourceKind, obj: DynamicObject) -> ResourceEvent {
    ResourceEvent {
        event_type,
        kind: kind.clone(),
        identity: Identity::new(
            obj.metadata.namespace.as_deref().unwrap_or_default(),
            obj.metadata.name.as_deref().unwrap_or_default(),
        ),
        resource_version: obj.metadata.resource_version.clone().unwrap_or_default(),
        previous_resource_version: None,
        object: Some(obj),
        error: None,
    }
}

fn stored(kind: &str, namespace: &str, name: &str, rv: &str) -> StoredResource {
    StoredResource {
        name: name.into(),
        namespace: namespace.into(),
        kind: kind.into(),
        api_version: "v1".into(),
        resource_version: rv.into(),
        data: "{}".into(),
    }
}
