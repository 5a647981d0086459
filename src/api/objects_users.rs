//! Objects Users
//!
//! Users of the S3-compatible object storage, `/objects-users`.

use super::client::CloudscaleClient;
use super::Tags;
use anyhow::Result;
use serde::{Deserialize, Serialize};

const COLLECTION: &str = "objects-users";

/// S3 credentials belonging to an objects user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectsUserKey {
    pub access_key: String,
    pub secret_key: String,
}

/// Objects user as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectsUser {
    pub href: String,
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub keys: Vec<ObjectsUserKey>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectsUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

/// Borrowed view of the objects user collection
pub struct ObjectsUsers<'a> {
    client: &'a CloudscaleClient,
}

impl<'a> ObjectsUsers<'a> {
    pub(crate) fn new(client: &'a CloudscaleClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &ObjectsUserRequest) -> Result<ObjectsUser> {
        let url = self.client.collection_url(COLLECTION);
        self.client.http.post(&url, self.client.token(), request).await
    }

    pub async fn get(&self, id: &str) -> Result<ObjectsUser> {
        let url = self.client.object_url(COLLECTION, id);
        self.client.http.get(&url, self.client.token()).await
    }

    pub async fn list(&self) -> Result<Vec<ObjectsUser>> {
        let url = self.client.collection_url(COLLECTION);
        self.client.http.get(&url, self.client.token()).await
    }

    pub async fn update(&self, id: &str, request: &ObjectsUserRequest) -> Result<()> {
        let url = self.client.object_url(COLLECTION, id);
        self.client.http.patch(&url, self.client.token(), request).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = self.client.object_url(COLLECTION, id);
        self.client.http.delete(&url, self.client.token()).await
    }
}
