//! cloudscale.ch Client
//!
//! Main client for interacting with the API, combining the bearer token,
//! base URL and HTTP functionality. Resource collections hang off it as
//! cheap borrowed views (`client.load_balancers()`, `client.objects_users()`).

use super::http::ApiHttpClient;
use super::load_balancers::LoadBalancers;
use super::objects_users::ObjectsUsers;
use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

/// Default API endpoint
pub const DEFAULT_API_URL: &str = "https://api.cloudscale.ch/v1";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Main API client
#[derive(Clone)]
pub struct CloudscaleClient {
    pub http: ApiHttpClient,
    base_url: String,
    token: String,
}

impl CloudscaleClient {
    /// Create a new client against `base_url`
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid API URL: {}", base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("Invalid API URL scheme: {}", parsed.scheme());
        }
        if token.is_empty() {
            anyhow::bail!("Missing API token. Set CLOUDSCALE_API_TOKEN or api_token in the config file");
        }

        Ok(Self {
            http: ApiHttpClient::new(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Build the URL of a collection, e.g. `load-balancers`
    pub fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    /// Build the URL of a single object inside a collection
    pub fn object_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(id)
        )
    }

    pub fn load_balancers(&self) -> LoadBalancers<'_> {
        LoadBalancers::new(self)
    }

    pub fn objects_users(&self) -> ObjectsUsers<'_> {
        ObjectsUsers::new(self)
    }
}
