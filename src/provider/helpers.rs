//! Helpers shared by all resource handlers

use super::data::{ResourceData, State};
use crate::api::{is_not_found, Tags};
use anyhow::Result;
use serde_json::Value;

/// Collect the configured tags. Unset tags become an empty map so that a
/// removed `tags` block clears the remote tags.
pub fn copy_tags(d: &ResourceData) -> Tags {
    d.get_config("tags")
        .and_then(Value::as_object)
        .map(|tags| {
            tags.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

pub fn tags_value(tags: &Tags) -> Value {
    Value::Object(
        tags.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Write every gathered attribute into the resource data. `id` sets the
/// identifier instead of an attribute.
pub fn fill_resource_data(d: &mut ResourceData, raw: State) {
    for (key, value) in raw {
        if key == "id" {
            d.set_id(value.as_str().map(str::to_string));
        } else {
            d.set(key, value);
        }
    }
}

/// Treat a 404 as "the resource is gone": clear the id and succeed.
/// Any other error is returned with `msg` as context.
pub fn check_deleted(d: &mut ResourceData, err: anyhow::Error, msg: &str) -> Result<()> {
    if is_not_found(&err) {
        tracing::warn!(
            "{}: remote object {} not found, removing from state",
            msg,
            d.id().unwrap_or("-")
        );
        d.set_id(None);
        return Ok(());
    }

    Err(err.context(msg.to_string()))
}
