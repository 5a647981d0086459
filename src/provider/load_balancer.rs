//! `cloudscale_load_balancer`
//!
//! Lifecycle handlers and field mapping for load balancers. The API accepts
//! a single attribute per PATCH, so updates are issued one call per changed
//! attribute.

use super::data::{ResourceData, State};
use super::helpers::{check_deleted, copy_tags, fill_resource_data, tags_value};
use super::schema::{tags_attribute, Attribute, Schema, SchemaType};
use crate::api::load_balancers::{LoadBalancer, LoadBalancerRequest, VipAddressRequest};
use crate::api::CloudscaleClient;
use anyhow::{Context, Result};
use serde_json::{json, Value};

/// Attributes that can be changed in place, in the order they are applied
const UPDATABLE_ATTRIBUTES: &[&str] = &["name", "flavor_slug", "tags"];

pub fn load_balancer_schema(t: SchemaType) -> Schema {
    let mut vip = Schema::new();
    vip.insert("version", Attribute::int().computed(true));
    vip.insert("address", Attribute::string().computed(true).optional(t.is_resource()));
    vip.insert("subnet_uuid", Attribute::string().computed(true).optional(t.is_resource()));
    vip.insert("subnet_cidr", Attribute::string().computed(true));
    vip.insert("subnet_href", Attribute::string().computed(true));

    let mut schema = Schema::new();
    schema.insert(
        "name",
        Attribute::string()
            .required(t.is_resource())
            .optional(t.is_data_source()),
    );
    schema.insert(
        "flavor_slug",
        Attribute::string()
            .required(t.is_resource())
            .computed(t.is_data_source()),
    );
    schema.insert("href", Attribute::string().computed(true));
    schema.insert("status", Attribute::string().computed(true));
    schema.insert(
        "vip_addresses",
        Attribute::list_of(vip)
            .optional(t.is_resource())
            .computed(true)
            .force_new(t.is_resource()),
    );
    schema.insert(
        "zone_slug",
        Attribute::string()
            .required(t.is_resource())
            .optional(t.is_data_source())
            .computed(t.is_data_source())
            .force_new(t.is_resource()),
    );
    schema.insert("tags", tags_attribute());
    if t.is_data_source() {
        schema.insert("id", Attribute::string().optional(true).computed(true));
    }
    schema
}

/// Build one VIP sub-request per configured `vip_addresses` entry
pub fn create_vip_address_options(d: &ResourceData) -> Vec<VipAddressRequest> {
    (0..d.list_len("vip_addresses"))
        .map(|i| {
            let prefix = format!("vip_addresses.{}", i);
            VipAddressRequest {
                address: d.get_path_str(&format!("{}.address", prefix)).to_string(),
                subnet: d.get_path_str(&format!("{}.subnet_uuid", prefix)).to_string(),
            }
        })
        .collect()
}

/// Flatten an API load balancer into orchestrator attributes
pub fn gather_load_balancer_data(lb: &LoadBalancer) -> State {
    let mut m = State::new();
    m.insert("id".to_string(), json!(lb.uuid));
    m.insert("href".to_string(), json!(lb.href));
    m.insert("name".to_string(), json!(lb.name));
    m.insert("flavor_slug".to_string(), json!(lb.flavor.slug));
    m.insert("zone_slug".to_string(), json!(lb.zone.slug));
    m.insert("status".to_string(), json!(lb.status));

    let vips: Vec<Value> = lb
        .vip_addresses
        .iter()
        .map(|vip| {
            json!({
                "version": vip.version,
                "address": vip.address,
                "subnet_uuid": vip.subnet.uuid,
                "subnet_cidr": vip.subnet.cidr,
                "subnet_href": vip.subnet.href,
            })
        })
        .collect();
    m.insert("vip_addresses".to_string(), Value::Array(vips));
    m.insert("tags".to_string(), tags_value(&lb.tags));

    m
}

fn fill_load_balancer_schema(d: &mut ResourceData, lb: &LoadBalancer) {
    fill_resource_data(d, gather_load_balancer_data(lb));
}

/// Load balancer handlers, bound to a typed client
#[derive(Clone)]
pub struct LoadBalancerResource {
    client: CloudscaleClient,
}

impl LoadBalancerResource {
    pub fn new(client: CloudscaleClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, d: &mut ResourceData) -> Result<()> {
        let mut opts = LoadBalancerRequest {
            zone: Some(d.get_str("zone_slug").to_string()),
            name: Some(d.get_str("name").to_string()),
            flavor: Some(d.get_str("flavor_slug").to_string()),
            ..Default::default()
        };

        if d.list_len("vip_addresses") > 0 {
            opts.vip_addresses = Some(create_vip_address_options(d));
        }

        opts.tags = Some(copy_tags(d));

        tracing::debug!("LoadBalancer create configuration: {:?}", opts);

        let lb = self
            .client
            .load_balancers()
            .create(&opts)
            .await
            .context("Error creating load balancer")?;

        d.set_id(Some(lb.uuid.clone()));
        tracing::info!("LoadBalancer ID: {}", lb.uuid);

        fill_load_balancer_schema(d, &lb);
        Ok(())
    }

    pub async fn read(&self, d: &mut ResourceData) -> Result<()> {
        let Some(id) = d.id().map(str::to_string) else {
            return Ok(());
        };

        match self.client.load_balancers().get(&id).await {
            Ok(lb) => {
                fill_load_balancer_schema(d, &lb);
                Ok(())
            }
            Err(err) => check_deleted(d, err, "Error retrieving load balancer"),
        }
    }

    pub async fn update(&self, d: &mut ResourceData) -> Result<()> {
        let Some(id) = d.id().map(str::to_string) else {
            anyhow::bail!("Cannot update load balancer without an id");
        };

        for attribute in UPDATABLE_ATTRIBUTES {
            // Load balancer attributes can only be changed one at a time
            if !d.has_change(attribute) {
                continue;
            }

            let mut opts = LoadBalancerRequest::default();
            match *attribute {
                "name" => opts.name = Some(d.get_str("name").to_string()),
                "flavor_slug" => opts.flavor = Some(d.get_str("flavor_slug").to_string()),
                "tags" => opts.tags = Some(copy_tags(d)),
                _ => continue,
            }

            tracing::debug!("LoadBalancer {} update {}: {:?}", id, attribute, opts);
            self.client
                .load_balancers()
                .update(&id, &opts)
                .await
                .with_context(|| format!("Error updating the load balancer ({})", id))?;
        }

        self.read(d).await
    }

    pub async fn delete(&self, d: &mut ResourceData) -> Result<()> {
        let Some(id) = d.id().map(str::to_string) else {
            return Ok(());
        };

        tracing::info!("Deleting LoadBalancer: {}", id);
        match self.client.load_balancers().delete(&id).await {
            Ok(()) => Ok(()),
            Err(err) => check_deleted(d, err, "Error deleting load balancer"),
        }
    }

    /// All load balancers, flattened, for data source lookups
    pub async fn list(&self) -> Result<Vec<State>> {
        let lbs = self
            .client
            .load_balancers()
            .list()
            .await
            .context("Error listing load balancers")?;
        Ok(lbs.iter().map(gather_load_balancer_data).collect())
    }

    /// `(id, name)` of every load balancer, for the sweeper
    pub async fn names(&self) -> Result<Vec<(String, String)>> {
        let lbs = self.client.load_balancers().list().await?;
        Ok(lbs.into_iter().map(|lb| (lb.uuid, lb.name)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::DEFAULT_TIMEOUT;
    use crate::api::load_balancers::{SlugRef, SubnetStub, VipAddress};
    use proptest::prelude::*;

    fn config(value: Value) -> State {
        value.as_object().cloned().unwrap()
    }

    fn sample_lb(vips: usize) -> LoadBalancer {
        LoadBalancer {
            uuid: "lb-uuid".to_string(),
            href: "https://api.cloudscale.ch/v1/load-balancers/lb-uuid".to_string(),
            name: "web".to_string(),
            flavor: SlugRef {
                slug: "lb-standard".to_string(),
                name: None,
            },
            zone: SlugRef {
                slug: "lpg1".to_string(),
                name: None,
            },
            status: "running".to_string(),
            vip_addresses: (0..vips)
                .map(|i| VipAddress {
                    version: 4,
                    address: format!("10.0.{}.5", i),
                    subnet: SubnetStub {
                        href: format!("https://api/subnets/s{}", i),
                        uuid: format!("s{}", i),
                        cidr: format!("10.0.{}.0/24", i),
                    },
                })
                .collect(),
            tags: Default::default(),
            created_at: None,
        }
    }

    #[test]
    fn test_resource_schema_flags() {
        let schema = load_balancer_schema(SchemaType::Resource);
        assert!(schema["name"].required);
        assert!(schema["zone_slug"].force_new);
        assert!(schema["status"].is_computed_only());
        assert!(!schema.contains_key("id"));
        let vip = schema["vip_addresses"].elem.as_ref().unwrap();
        assert!(vip["subnet_uuid"].optional);
        assert!(vip["subnet_cidr"].is_computed_only());
    }

    #[test]
    fn test_data_source_schema_flags() {
        let schema = load_balancer_schema(SchemaType::DataSource);
        assert!(schema["name"].optional);
        assert!(!schema["name"].required);
        assert!(schema["flavor_slug"].is_computed_only());
        assert!(!schema["zone_slug"].force_new);
        assert!(schema["id"].optional);
    }

    #[test]
    fn test_gather_sets_all_fields() {
        let state = gather_load_balancer_data(&sample_lb(2));
        assert_eq!(state["id"], "lb-uuid");
        assert_eq!(state["flavor_slug"], "lb-standard");
        assert_eq!(state["zone_slug"], "lpg1");
        assert_eq!(state["vip_addresses"][1]["subnet_cidr"], "10.0.1.0/24");
        assert_eq!(state["vip_addresses"][1]["subnet_href"], "https://api/subnets/s1");
        assert_eq!(state["tags"], json!({}));
    }

    #[test]
    fn test_fill_sets_id() {
        let mut d = ResourceData::from_config(State::new());
        fill_load_balancer_schema(&mut d, &sample_lb(0));
        assert_eq!(d.id(), Some("lb-uuid"));
        assert_eq!(d.get_str("status"), "running");
    }

    fn unreachable_handler() -> LoadBalancerResource {
        // port 9 (discard) refuses connections, any request would fail
        let client = CloudscaleClient::new("http://127.0.0.1:9/v1", "token", DEFAULT_TIMEOUT).unwrap();
        LoadBalancerResource::new(client)
    }

    #[tokio::test]
    async fn test_handlers_without_id_do_not_call_the_api() {
        let handler = unreachable_handler();

        let mut d = ResourceData::from_config(State::new());
        handler.read(&mut d).await.unwrap();
        assert_eq!(d.id(), None);

        handler.delete(&mut d).await.unwrap();
        assert_eq!(d.id(), None);

        let err = handler.update(&mut d).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot update load balancer without an id");
    }

    proptest! {
        /// N configured VIP entries produce exactly N sub-requests, in order
        #[test]
        fn vip_options_match_config(entries in prop::collection::vec(("[0-9.]{0,15}", "[a-f0-9-]{0,36}"), 0..8)) {
            let vips: Vec<Value> = entries
                .iter()
                .map(|(address, subnet)| json!({"address": address, "subnet_uuid": subnet}))
                .collect();
            let d = ResourceData::from_config(config(json!({"vip_addresses": vips})));

            let options = create_vip_address_options(&d);
            prop_assert_eq!(options.len(), entries.len());
            for (option, (address, subnet)) in options.iter().zip(&entries) {
                prop_assert_eq!(&option.address, address);
                prop_assert_eq!(&option.subnet, subnet);
            }
        }

        /// Gathered VIP records mirror the API response one-to-one
        #[test]
        fn gathered_vips_match_response(n in 0usize..8) {
            let state = gather_load_balancer_data(&sample_lb(n));
            let vips = state["vip_addresses"].as_array().unwrap();
            prop_assert_eq!(vips.len(), n);
            for vip in vips {
                prop_assert!(!vip["subnet_cidr"].as_str().unwrap().is_empty());
            }
        }
    }
}
