//! `cloudscale_objects_user`

use super::data::{ResourceData, State};
use super::helpers::{check_deleted, copy_tags, fill_resource_data, tags_value};
use super::schema::{tags_attribute, Attribute, Schema, SchemaType};
use crate::api::objects_users::{ObjectsUser, ObjectsUserRequest};
use crate::api::CloudscaleClient;
use anyhow::{Context, Result};
use serde_json::{json, Value};

const UPDATABLE_ATTRIBUTES: &[&str] = &["display_name", "tags"];

pub fn objects_user_schema(t: SchemaType) -> Schema {
    let mut key = Schema::new();
    key.insert("access_key", Attribute::string().computed(true));
    key.insert("secret_key", Attribute::string().computed(true));

    let mut schema = Schema::new();
    schema.insert(
        "display_name",
        Attribute::string()
            .required(t.is_resource())
            .optional(t.is_data_source()),
    );
    schema.insert("href", Attribute::string().computed(true));
    schema.insert(
        "user_id",
        Attribute::string()
            .computed(true)
            .optional(t.is_data_source()),
    );
    schema.insert("keys", Attribute::list_of(key).computed(true));
    schema.insert("tags", tags_attribute());
    if t.is_data_source() {
        schema.insert("id", Attribute::string().optional(true).computed(true));
    }
    schema
}

pub fn gather_objects_user_data(user: &ObjectsUser) -> State {
    let mut m = State::new();
    m.insert("id".to_string(), json!(user.id));
    m.insert("href".to_string(), json!(user.href));
    m.insert("user_id".to_string(), json!(user.id));
    m.insert("display_name".to_string(), json!(user.display_name));

    let keys: Vec<Value> = user
        .keys
        .iter()
        .map(|k| json!({"access_key": k.access_key, "secret_key": k.secret_key}))
        .collect();
    m.insert("keys".to_string(), Value::Array(keys));
    m.insert("tags".to_string(), tags_value(&user.tags));

    m
}

fn fill_objects_user_schema(d: &mut ResourceData, user: &ObjectsUser) {
    fill_resource_data(d, gather_objects_user_data(user));
}

#[derive(Clone)]
pub struct ObjectsUserResource {
    client: CloudscaleClient,
}

impl ObjectsUserResource {
    pub fn new(client: CloudscaleClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, d: &mut ResourceData) -> Result<()> {
        let opts = ObjectsUserRequest {
            display_name: Some(d.get_str("display_name").to_string()),
            tags: Some(copy_tags(d)),
        };

        tracing::debug!("ObjectsUser create configuration: {:?}", opts);

        let user = self
            .client
            .objects_users()
            .create(&opts)
            .await
            .context("Error creating objects user")?;

        d.set_id(Some(user.id.clone()));
        tracing::info!("ObjectsUser ID: {}", user.id);

        fill_objects_user_schema(d, &user);
        Ok(())
    }

    pub async fn read(&self, d: &mut ResourceData) -> Result<()> {
        let Some(id) = d.id().map(str::to_string) else {
            return Ok(());
        };

        match self.client.objects_users().get(&id).await {
            Ok(user) => {
                fill_objects_user_schema(d, &user);
                Ok(())
            }
            Err(err) => check_deleted(d, err, "Error retrieving objects user"),
        }
    }

    pub async fn update(&self, d: &mut ResourceData) -> Result<()> {
        let Some(id) = d.id().map(str::to_string) else {
            anyhow::bail!("Cannot update objects user without an id");
        };

        for attribute in UPDATABLE_ATTRIBUTES {
            if !d.has_change(attribute) {
                continue;
            }

            let mut opts = ObjectsUserRequest::default();
            match *attribute {
                "display_name" => opts.display_name = Some(d.get_str("display_name").to_string()),
                "tags" => opts.tags = Some(copy_tags(d)),
                _ => continue,
            }

            self.client
                .objects_users()
                .update(&id, &opts)
                .await
                .with_context(|| format!("Error updating the objects user ({})", id))?;
        }

        self.read(d).await
    }

    pub async fn delete(&self, d: &mut ResourceData) -> Result<()> {
        let Some(id) = d.id().map(str::to_string) else {
            return Ok(());
        };

        tracing::info!("Deleting ObjectsUser: {}", id);
        match self.client.objects_users().delete(&id).await {
            Ok(()) => Ok(()),
            Err(err) => check_deleted(d, err, "Error deleting objects user"),
        }
    }

    pub async fn list(&self) -> Result<Vec<State>> {
        let users = self
            .client
            .objects_users()
            .list()
            .await
            .context("Error listing objects users")?;
        Ok(users.iter().map(gather_objects_user_data).collect())
    }

    pub async fn names(&self) -> Result<Vec<(String, String)>> {
        let users = self.client.objects_users().list().await?;
        Ok(users.into_iter().map(|u| (u.id, u.display_name)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::DEFAULT_TIMEOUT;
    use crate::api::objects_users::ObjectsUserKey;

    #[test]
    fn test_gather_flattens_keys() {
        let user = ObjectsUser {
            href: "https://api.cloudscale.ch/v1/objects-users/6fe3".to_string(),
            id: "6fe3".to_string(),
            display_name: "terraform-1".to_string(),
            keys: vec![ObjectsUserKey {
                access_key: "AK".to_string(),
                secret_key: "SK".to_string(),
            }],
            tags: [("my-foo".to_string(), "foo".to_string())].into_iter().collect(),
        };

        let state = gather_objects_user_data(&user);
        assert_eq!(state["user_id"], "6fe3");
        assert_eq!(state["keys"][0]["secret_key"], "SK");
        assert_eq!(state["tags"]["my-foo"], "foo");
    }

    #[test]
    fn test_schema_keys_are_computed() {
        let schema = objects_user_schema(SchemaType::Resource);
        assert!(schema["display_name"].required);
        assert!(schema["keys"].is_computed_only());
        assert!(schema["user_id"].is_computed_only());

        let ds = objects_user_schema(SchemaType::DataSource);
        assert!(ds["user_id"].optional);
    }

    #[tokio::test]
    async fn test_handlers_without_id_do_not_call_the_api() {
        let client = CloudscaleClient::new("http://127.0.0.1:9/v1", "token", DEFAULT_TIMEOUT).unwrap();
        let handler = ObjectsUserResource::new(client);

        let mut d = ResourceData::from_config(State::new());
        handler.read(&mut d).await.unwrap();
        handler.delete(&mut d).await.unwrap();
        assert_eq!(d.id(), None);

        let err = handler.update(&mut d).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot update objects user without an id");
    }
}
