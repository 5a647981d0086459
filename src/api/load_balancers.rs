//! Load Balancers
//!
//! Typed request/response shapes and calls for `/load-balancers`.

use super::client::CloudscaleClient;
use super::Tags;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const COLLECTION: &str = "load-balancers";

/// Reference to a zone or flavor by slug
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugRef {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Subnet as returned inside a VIP address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetStub {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub cidr: String,
}

/// VIP address as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VipAddress {
    pub version: i64,
    pub address: String,
    #[serde(default)]
    pub subnet: SubnetStub,
}

/// Load balancer as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub uuid: String,
    pub href: String,
    pub name: String,
    pub flavor: SlugRef,
    pub zone: SlugRef,
    pub status: String,
    #[serde(default)]
    pub vip_addresses: Vec<VipAddress>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// VIP address sub-request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VipAddressRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet: String,
}

/// Create/update request. Unset fields are omitted so a PATCH only carries
/// the attribute being changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadBalancerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_addresses: Option<Vec<VipAddressRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

/// Borrowed view of the load balancer collection
pub struct LoadBalancers<'a> {
    client: &'a CloudscaleClient,
}

impl<'a> LoadBalancers<'a> {
    pub(crate) fn new(client: &'a CloudscaleClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &LoadBalancerRequest) -> Result<LoadBalancer> {
        let url = self.client.collection_url(COLLECTION);
        self.client.http.post(&url, self.client.token(), request).await
    }

    pub async fn get(&self, uuid: &str) -> Result<LoadBalancer> {
        let url = self.client.object_url(COLLECTION, uuid);
        self.client.http.get(&url, self.client.token()).await
    }

    pub async fn list(&self) -> Result<Vec<LoadBalancer>> {
        let url = self.client.collection_url(COLLECTION);
        self.client.http.get(&url, self.client.token()).await
    }

    pub async fn update(&self, uuid: &str, request: &LoadBalancerRequest) -> Result<()> {
        let url = self.client.object_url(COLLECTION, uuid);
        self.client.http.patch(&url, self.client.token(), request).await
    }

    pub async fn delete(&self, uuid: &str) -> Result<()> {
        let url = self.client.object_url(COLLECTION, uuid);
        self.client.http.delete(&url, self.client.token()).await
    }
}
