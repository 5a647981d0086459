//! Local harness
//!
//! A minimal stand-in for the orchestrator: reads a resource configuration
//! file, keeps the resulting state in a JSON file and drives the provider
//! handlers in the order an orchestrator would.

use crate::provider::schema::{self, SchemaType};
use crate::provider::{Provider, ResourceData, ResourceKind, State};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// State of one managed resource as written to the state file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub attributes: State,
}

impl StoredResource {
    fn from_data(kind: ResourceKind, d: &ResourceData) -> Option<Self> {
        d.id().map(|id| Self {
            kind: kind.type_name().to_string(),
            id: id.to_string(),
            attributes: d.state(),
        })
    }

    pub fn resource_kind(&self) -> Result<ResourceKind> {
        self.kind.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Replaced,
    Unchanged,
}

impl std::fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyOutcome::Created => write!(f, "created"),
            ApplyOutcome::Updated => write!(f, "updated in-place"),
            ApplyOutcome::Replaced => write!(f, "replaced"),
            ApplyOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Read a resource configuration; `.yaml`/`.yml` files are parsed as YAML,
/// everything else as JSON.
pub fn load_config_file(path: &Path) -> Result<State> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value: Value = if is_yaml {
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?
    } else {
        serde_json::from_str(&content).context("Failed to parse JSON configuration")?
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(State::new()),
        _ => anyhow::bail!("Configuration in {} must be a mapping", path.display()),
    }
}

pub fn load_state(path: &Path) -> Result<Option<StoredResource>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state {}", path.display()))?;
    let stored = serde_json::from_str(&content).context("Failed to parse state file")?;
    Ok(Some(stored))
}

/// Write the state file, or remove it when the resource no longer exists
pub fn save_state(path: &Path, stored: Option<&StoredResource>) -> Result<()> {
    match stored {
        Some(stored) => {
            let content = serde_json::to_string_pretty(stored)?;
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write state {}", path.display()))?;
        }
        None if path.exists() => std::fs::remove_file(path)?,
        None => {}
    }
    Ok(())
}

/// Re-read a stored resource. `None` means it was deleted remotely.
pub async fn refresh(provider: &Provider, stored: &StoredResource) -> Result<Option<StoredResource>> {
    let kind = stored.resource_kind()?;
    let mut d = ResourceData::from_state(stored.id.as_str(), stored.attributes.clone());
    provider.read(kind, &mut d).await?;
    Ok(StoredResource::from_data(kind, &d))
}

/// Bring the remote object in line with `config`.
///
/// Missing resources are created, force-new changes replace the resource
/// (delete, then create), anything else is updated in place.
pub async fn apply(
    provider: &Provider,
    kind: ResourceKind,
    config: State,
    prior: Option<&StoredResource>,
) -> Result<(ApplyOutcome, StoredResource)> {
    let schema = kind.schema(SchemaType::Resource);
    schema::validate(&schema, &config)?;

    if let Some(prior) = prior {
        if prior.resource_kind()? != kind {
            anyhow::bail!("State holds a {}, not a {}", prior.kind, kind);
        }
    }

    let current = match prior {
        Some(prior) => refresh(provider, prior).await?,
        None => None,
    };

    let Some(current) = current else {
        let mut d = ResourceData::from_config(config);
        provider.create(kind, &mut d).await?;
        return created(kind, &d, ApplyOutcome::Created);
    };

    let mut d = ResourceData::planned(current.id.as_str(), current.attributes.clone(), config.clone());

    if d.requires_replacement(&schema) {
        tracing::info!("{} {} must be replaced", kind, current.id);
        provider.delete(kind, &mut d).await?;

        let mut fresh = ResourceData::from_config(config);
        provider.create(kind, &mut fresh).await?;
        return created(kind, &fresh, ApplyOutcome::Replaced);
    }

    let changed = schema
        .iter()
        .any(|(name, attr)| !attr.is_computed_only() && !attr.force_new && d.has_change(name));
    if !changed {
        return Ok((ApplyOutcome::Unchanged, current));
    }

    provider.update(kind, &mut d).await?;
    match StoredResource::from_data(kind, &d) {
        Some(stored) => Ok((ApplyOutcome::Updated, stored)),
        None => anyhow::bail!("{} {} disappeared during update", kind, current.id),
    }
}

fn created(kind: ResourceKind, d: &ResourceData, outcome: ApplyOutcome) -> Result<(ApplyOutcome, StoredResource)> {
    StoredResource::from_data(kind, d)
        .map(|stored| (outcome, stored))
        .ok_or_else(|| anyhow::anyhow!("Create of {} returned no identifier", kind))
}

pub async fn destroy(provider: &Provider, stored: &StoredResource) -> Result<()> {
    let kind = stored.resource_kind()?;
    let mut d = ResourceData::from_state(stored.id.as_str(), stored.attributes.clone());
    provider.delete(kind, &mut d).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_yaml_and_json_configs() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("lb.yaml");
        std::fs::write(&yaml, "name: web\nflavor_slug: lb-standard\ntags:\n  env: prod\n").unwrap();
        let config = load_config_file(&yaml).unwrap();
        assert_eq!(config["tags"], json!({"env": "prod"}));

        let json_path = dir.path().join("user.json");
        std::fs::write(&json_path, r#"{"display_name": "terraform-1"}"#).unwrap();
        assert_eq!(load_config_file(&json_path).unwrap()["display_name"], "terraform-1");

        let list = dir.path().join("list.json");
        std::fs::write(&list, "[1, 2]").unwrap();
        assert!(load_config_file(&list).is_err());
    }

    #[test]
    fn test_state_file_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        assert!(load_state(&path).unwrap().is_none());

        let stored = StoredResource {
            kind: "cloudscale_objects_user".to_string(),
            id: "6fe3".to_string(),
            attributes: json!({"display_name": "x"}).as_object().cloned().unwrap(),
        };
        save_state(&path, Some(&stored)).unwrap();
        assert_eq!(load_state(&path).unwrap(), Some(stored));

        save_state(&path, None).unwrap();
        assert!(!path.exists());
    }
}
