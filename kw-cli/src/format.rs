use kw_core::prelude::*;
use kw_watch::{
    EventType,
    ResourceEvent,
};

const TRUNCATED_SUFFIX: &str = "... (truncated)";

/// Render one event as a single human-readable line.
pub fn format_event(evt: &ResourceEvent) -> String {
    let prefix = format!("{}: {}, Namespace: {}", evt.kind, evt.identity.name, evt.identity.namespace);

    match evt.event_type {
        EventType::Added => {
            let line = format!("[ADDED] {prefix}, ResourceVersion: {}", evt.resource_version);
            with_spec(line, evt.object.as_ref())
        },
        EventType::Modified => {
            let prev = evt.previous_resource_version.as_deref().unwrap_or_default();
            if prev == evt.resource_version {
                format!("[MODIFIED-NO-CHANGE] {prefix}, ResourceVersion unchanged: {}", evt.resource_version)
            } else {
                let line = format!("[MODIFIED] {prefix}, ResourceVersion: {prev} -> {}", evt.resource_version);
                with_spec(line, evt.object.as_ref())
            }
        },
        EventType::Deleted => format!("[DELETED] {prefix}, Final ResourceVersion: {}", evt.resource_version),
        EventType::Error => match &evt.error {
            Some(err) => format!("[ERROR] {prefix}, Error: {err}"),
            None => format!("[ERROR] {prefix}, Unknown error"),
        },
    }
}

fn with_spec(mut line: String, obj: Option<&DynamicObject>) -> String {
    if let Some(spec) = spec_summary(obj) {
        line.push_str(", Spec: ");
        line.push_str(&spec);
    }
    line
}

// Compact JSON of the object's spec, cut down to SPEC_SUMMARY_MAX_LEN characters.  Objects with
// no spec (or an empty one) get nothing.
pub fn spec_summary(obj: Option<&DynamicObject>) -> Option<String> {
    let spec = obj?.data.get("spec")?.to_string();
    if spec.is_empty() {
        return None;
    }

    if spec.chars().count() <= SPEC_SUMMARY_MAX_LEN {
        return Some(spec);
    }

    let mut truncated: String = spec.chars().take(SPEC_SUMMARY_MAX_LEN).collect();
    truncated.push_str(TRUNCATED_SUFFIX);
    Some(truncated)
}
