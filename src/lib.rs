//! cloudscale.ch provider
//!
//! Maps declarative resources (load balancers, objects users and their tags)
//! onto the cloudscale.ch REST API.
//!
//! - [`api`] - Typed REST client
//! - [`provider`] - Schemas and lifecycle handlers per resource type
//! - [`harness`] - Minimal local orchestrator used by the CLI
//! - [`config`] - Token and endpoint configuration

pub mod api;
pub mod config;
pub mod harness;
pub mod provider;

/// Version injected at compile time via CLOUDSCALE_PROVIDER_VERSION (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CLOUDSCALE_PROVIDER_VERSION") {
    Some(v) => v,
    None => "dev",
};
