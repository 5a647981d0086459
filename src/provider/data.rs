//! Per-resource attribute data handed to every handler
//!
//! [`ResourceData`] layers three attribute maps: the prior state persisted by
//! the orchestrator, the user's configuration, and the values written by the
//! handler during this call. Reads see the most recent layer.

use super::schema::Schema;
use serde_json::{Map, Value};

/// Attribute map as persisted by the orchestrator
pub type State = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: Option<String>,
    prior: State,
    config: State,
    written: State,
}

impl ResourceData {
    /// Data for a resource that does not exist yet
    pub fn from_config(config: State) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Data for an existing resource, with its stored state
    pub fn from_state(id: impl Into<String>, prior: State) -> Self {
        Self {
            id: Some(id.into()),
            prior,
            ..Default::default()
        }
    }

    /// Data for an existing resource whose configuration may have changed
    pub fn planned(id: impl Into<String>, prior: State, config: State) -> Self {
        Self {
            id: Some(id.into()),
            prior,
            config,
            written: State::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Set or clear the identifier. A cleared id tells the orchestrator the
    /// remote object is gone.
    pub fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.written
            .get(key)
            .or_else(|| self.config.get(key))
            .or_else(|| self.prior.get(key))
    }

    /// The value as configured by the user, ignoring stored state
    pub fn get_config(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get_list(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Look up a dotted path such as `vip_addresses.0.subnet_uuid`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;

        for part in parts {
            current = match part.parse::<usize>() {
                Ok(idx) => current.get(idx)?,
                Err(_) => current.get(part)?,
            };
        }

        Some(current)
    }

    pub fn get_path_str(&self, path: &str) -> &str {
        self.get_path(path).and_then(Value::as_str).unwrap_or_default()
    }

    /// Number of elements of a list attribute (the `name.#` of the orchestrator)
    pub fn list_len(&self, key: &str) -> usize {
        self.get_list(key).len()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.written.insert(key.into(), value);
    }

    /// Whether the configuration differs from the prior state for `key`
    pub fn has_change(&self, key: &str) -> bool {
        normalize(self.config.get(key)) != normalize(self.prior.get(key))
    }

    /// Whether a force-new attribute differs from the prior state.
    ///
    /// Computed attributes left unset by the user keep their stored value.
    /// Nested list elements are compared only on the keys the user set.
    pub fn requires_replacement(&self, schema: &Schema) -> bool {
        schema
            .iter()
            .filter(|(_, attr)| attr.force_new)
            .any(|(name, attr)| {
                let config = normalize(self.config.get(*name));
                if attr.computed && config.is_none() {
                    return false;
                }
                match (config, normalize(self.prior.get(*name))) {
                    (None, None) => false,
                    (Some(c), Some(p)) if attr.elem.is_some() => !config_matches(c, p),
                    (c, p) => c != p,
                }
            })
    }

    /// Resulting attribute map, without the id
    pub fn state(&self) -> State {
        let mut state = self.prior.clone();
        state.extend(self.config.clone());
        state.extend(self.written.clone());
        state.remove("id");
        state
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn normalize(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !is_empty(v))
}

/// Compare configured values against stored ones, ignoring keys the
/// configuration leaves empty (the computed parts of nested elements).
fn config_matches(config: &Value, prior: &Value) -> bool {
    match (config, prior) {
        (Value::Object(c), Value::Object(p)) => c
            .iter()
            .filter(|(_, v)| !is_empty(v))
            .all(|(k, v)| p.get(k).map(|pv| config_matches(v, pv)).unwrap_or(false)),
        (Value::Array(c), Value::Array(p)) => {
            c.len() == p.len() && c.iter().zip(p).all(|(cv, pv)| config_matches(cv, pv))
        }
        _ => config == prior,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::schema::Attribute;
    use serde_json::json;

    fn map(value: Value) -> State {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_layers_prefer_written_values() {
        let mut d = ResourceData::planned(
            "id-1",
            map(json!({"name": "old", "status": "running"})),
            map(json!({"name": "new"})),
        );
        assert_eq!(d.get_str("name"), "new");
        assert_eq!(d.get_str("status"), "running");

        d.set("name", json!("remote"));
        assert_eq!(d.get_str("name"), "remote");
    }

    #[test]
    fn test_get_path_walks_lists() {
        let d = ResourceData::from_config(map(json!({
            "vip_addresses": [{"address": "10.0.0.1", "subnet_uuid": "s1"}]
        })));
        assert_eq!(d.get_path_str("vip_addresses.0.subnet_uuid"), "s1");
        assert_eq!(d.get_path_str("vip_addresses.1.address"), "");
        assert_eq!(d.list_len("vip_addresses"), 1);
    }

    #[test]
    fn test_has_change_treats_empty_as_unset() {
        let d = ResourceData::planned(
            "id-1",
            map(json!({"tags": {}, "name": "a", "flavor_slug": "small"})),
            map(json!({"name": "a", "flavor_slug": "large"})),
        );
        assert!(!d.has_change("tags"));
        assert!(!d.has_change("name"));
        assert!(d.has_change("flavor_slug"));
    }

    #[test]
    fn test_clearing_tags_is_a_change() {
        let d = ResourceData::planned(
            "id-1",
            map(json!({"tags": {"a": "1"}})),
            map(json!({})),
        );
        assert!(d.has_change("tags"));
    }

    #[test]
    fn test_requires_replacement_on_force_new() {
        let mut elem = Schema::new();
        elem.insert("address", Attribute::string().optional(true).computed(true));
        elem.insert("subnet_cidr", Attribute::string().computed(true));

        let mut schema = Schema::new();
        schema.insert("zone_slug", Attribute::string().required(true).force_new(true));
        schema.insert(
            "vip_addresses",
            Attribute::list_of(elem).optional(true).computed(true).force_new(true),
        );

        let prior = map(json!({
            "zone_slug": "lpg1",
            "vip_addresses": [{"address": "10.0.0.1", "subnet_cidr": "10.0.0.0/24"}]
        }));

        let same = ResourceData::planned(
            "id",
            prior.clone(),
            map(json!({"zone_slug": "lpg1", "vip_addresses": [{"address": "10.0.0.1"}]})),
        );
        assert!(!same.requires_replacement(&schema));

        let unset_vips = ResourceData::planned("id", prior.clone(), map(json!({"zone_slug": "lpg1"})));
        assert!(!unset_vips.requires_replacement(&schema));

        let moved = ResourceData::planned("id", prior.clone(), map(json!({"zone_slug": "rma1"})));
        assert!(moved.requires_replacement(&schema));

        let readdressed = ResourceData::planned(
            "id",
            prior,
            map(json!({"zone_slug": "lpg1", "vip_addresses": [{"address": "10.0.0.2"}]})),
        );
        assert!(readdressed.requires_replacement(&schema));
    }

    #[test]
    fn test_state_merges_layers_without_id() {
        let mut d = ResourceData::from_config(map(json!({"name": "a", "id": "x"})));
        d.set("status", json!("running"));
        let state = d.state();
        assert_eq!(state.get("name"), Some(&json!("a")));
        assert_eq!(state.get("status"), Some(&json!("running")));
        assert!(!state.contains_key("id"));
    }
}
