//! cloudscale.ch API interaction module
//!
//! This module provides the typed client the resource handlers are built on.
//!
//! # Module Structure
//!
//! - [`client`] - Main client holding the token and base URL
//! - [`http`] - HTTP utilities and the [`ApiError`](http::ApiError) type
//! - [`load_balancers`] - `/load-balancers` shapes and calls
//! - [`objects_users`] - `/objects-users` shapes and calls
//!
//! # Example
//!
//! ```ignore
//! use cloudscale_provider::api::client::{CloudscaleClient, DEFAULT_API_URL, DEFAULT_TIMEOUT};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = CloudscaleClient::new(DEFAULT_API_URL, "token", DEFAULT_TIMEOUT)?;
//!     let lbs = client.load_balancers().list().await?;
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;

pub mod client;
pub mod http;
pub mod load_balancers;
pub mod objects_users;

/// Tags attached to any taggable object
pub type Tags = BTreeMap<String, String>;

pub use client::CloudscaleClient;
pub use http::{is_not_found, ApiError};
