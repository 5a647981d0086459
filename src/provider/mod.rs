//! Provider layer
//!
//! Maps orchestrator resource types onto the typed API client.
//!
//! # Architecture
//!
//! - [`schema`] - Immutable schema descriptions and configuration validation
//! - [`data`] - [`ResourceData`], the attribute layers handed to handlers
//! - [`helpers`] - Tag copying, state filling and not-found reconciliation
//! - [`load_balancer`] / [`objects_user`] - Per-resource handlers
//! - [`sweep`] - Removal of leftover test resources
//!
//! # Example
//!
//! ```ignore
//! use cloudscale_provider::provider::{Provider, ResourceKind, ResourceData};
//!
//! async fn example(provider: &Provider) -> anyhow::Result<()> {
//!     let mut d = ResourceData::from_state("2ba8b3f4-...", Default::default());
//!     provider.read(ResourceKind::LoadBalancer, &mut d).await?;
//!     if d.id().is_none() {
//!         println!("gone");
//!     }
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod helpers;
pub mod load_balancer;
pub mod objects_user;
pub mod schema;
pub mod sweep;

use crate::api::CloudscaleClient;
use anyhow::Result;
use std::fmt;
use std::str::FromStr;

pub use data::{ResourceData, State};
pub use load_balancer::LoadBalancerResource;
pub use objects_user::ObjectsUserResource;
pub use schema::{Schema, SchemaType};

/// Resource types served by this provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    LoadBalancer,
    ObjectsUser,
}

impl ResourceKind {
    pub const ALL: &'static [ResourceKind] = &[ResourceKind::LoadBalancer, ResourceKind::ObjectsUser];

    /// Type name as used in configuration files
    pub fn type_name(self) -> &'static str {
        match self {
            ResourceKind::LoadBalancer => "cloudscale_load_balancer",
            ResourceKind::ObjectsUser => "cloudscale_objects_user",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            ResourceKind::LoadBalancer => "load balancer",
            ResourceKind::ObjectsUser => "objects user",
        }
    }

    pub fn schema(self, t: SchemaType) -> Schema {
        match self {
            ResourceKind::LoadBalancer => load_balancer::load_balancer_schema(t),
            ResourceKind::ObjectsUser => objects_user::objects_user_schema(t),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|k| k.type_name() == s || k.type_name().trim_start_matches("cloudscale_") == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown resource type: {}", s))
    }
}

/// Entry point the orchestrator talks to. Holds one handler per resource
/// type, each built from the same client.
#[derive(Clone)]
pub struct Provider {
    load_balancers: LoadBalancerResource,
    objects_users: ObjectsUserResource,
}

impl Provider {
    pub fn new(client: CloudscaleClient) -> Self {
        Self {
            load_balancers: LoadBalancerResource::new(client.clone()),
            objects_users: ObjectsUserResource::new(client),
        }
    }

    pub async fn create(&self, kind: ResourceKind, d: &mut ResourceData) -> Result<()> {
        tracing::debug!("create: {}", kind);
        match kind {
            ResourceKind::LoadBalancer => self.load_balancers.create(d).await,
            ResourceKind::ObjectsUser => self.objects_users.create(d).await,
        }
    }

    pub async fn read(&self, kind: ResourceKind, d: &mut ResourceData) -> Result<()> {
        tracing::debug!("read: {} {}", kind, d.id().unwrap_or("-"));
        match kind {
            ResourceKind::LoadBalancer => self.load_balancers.read(d).await,
            ResourceKind::ObjectsUser => self.objects_users.read(d).await,
        }
    }

    pub async fn update(&self, kind: ResourceKind, d: &mut ResourceData) -> Result<()> {
        tracing::debug!("update: {} {}", kind, d.id().unwrap_or("-"));
        match kind {
            ResourceKind::LoadBalancer => self.load_balancers.update(d).await,
            ResourceKind::ObjectsUser => self.objects_users.update(d).await,
        }
    }

    pub async fn delete(&self, kind: ResourceKind, d: &mut ResourceData) -> Result<()> {
        tracing::debug!("delete: {} {}", kind, d.id().unwrap_or("-"));
        match kind {
            ResourceKind::LoadBalancer => self.load_balancers.delete(d).await,
            ResourceKind::ObjectsUser => self.objects_users.delete(d).await,
        }
    }

    /// Import by identifier: read the remote object into fresh state
    pub async fn import(&self, kind: ResourceKind, id: &str) -> Result<ResourceData> {
        let mut d = ResourceData::from_state(id, State::new());
        self.read(kind, &mut d).await?;

        if d.id().is_none() {
            anyhow::bail!(
                "Cannot import non-existent remote object: {} {} does not exist",
                kind,
                id
            );
        }
        Ok(d)
    }

    /// Look up exactly one object matching every attribute set in `filter`
    pub async fn read_data_source(&self, kind: ResourceKind, filter: &State) -> Result<ResourceData> {
        schema::validate(&kind.schema(SchemaType::DataSource), filter)?;

        let all = match kind {
            ResourceKind::LoadBalancer => self.load_balancers.list().await?,
            ResourceKind::ObjectsUser => self.objects_users.list().await?,
        };

        let mut matches: Vec<State> = all
            .into_iter()
            .filter(|state| matches_filter(state, filter))
            .collect();

        if matches.len() != 1 {
            anyhow::bail!(
                "Found {} {}s, expected one. Please refine your criteria.",
                matches.len(),
                kind.display_name()
            );
        }

        let mut found = matches.remove(0);
        let id = found
            .remove("id")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        Ok(ResourceData::from_state(id, found))
    }

    pub(crate) fn load_balancers(&self) -> &LoadBalancerResource {
        &self.load_balancers
    }

    pub(crate) fn objects_users(&self) -> &ObjectsUserResource {
        &self.objects_users
    }
}

fn matches_filter(state: &State, filter: &State) -> bool {
    filter
        .iter()
        .filter(|(_, v)| !v.is_null())
        .all(|(k, v)| state.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_kind_parses_full_and_short_names() {
        assert_eq!(
            "cloudscale_load_balancer".parse::<ResourceKind>().unwrap(),
            ResourceKind::LoadBalancer
        );
        assert_eq!("objects_user".parse::<ResourceKind>().unwrap(), ResourceKind::ObjectsUser);
        assert!("server".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_matches_filter_ignores_nulls() {
        let state = json!({"name": "web", "zone_slug": "lpg1"}).as_object().cloned().unwrap();
        let hit = json!({"name": "web", "zone_slug": null}).as_object().cloned().unwrap();
        let miss = json!({"name": "db"}).as_object().cloned().unwrap();
        assert!(matches_filter(&state, &hit));
        assert!(!matches_filter(&state, &miss));
        assert!(matches_filter(&state, &State::new()));
    }

    #[test]
    fn test_every_kind_has_tags() {
        for kind in ResourceKind::ALL {
            let _: Value = serde_json::to_value(kind.schema(SchemaType::Resource)).unwrap();
            assert!(kind.schema(SchemaType::Resource).contains_key("tags"));
        }
    }
}
