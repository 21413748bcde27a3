//! Service manifests: a TOML file declaring a service's scopes and routes.
//!
//! ```toml
//! host = "https://api.example.com"
//!
//! [[scopes]]
//! identifier = "notes.read"
//! description = "Read notes"
//!
//! [[features]]
//! root = "/v1"
//!
//! [[features.endpoints]]
//! method = "GET"
//! path = "/users/:id/notes"
//! ownership = "PRIVATE"
//! owner_param_index = 2
//! scopes = ["notes.read"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EndpointError;
use crate::method::HttpMethod;
use crate::ownership::Ownership;
use crate::registry::EndpointRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceManifest {
    /// Application host all features live under.
    pub host: String,

    #[serde(default)]
    pub scopes: Vec<ScopeEntry>,

    #[serde(default)]
    pub features: Vec<FeatureEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeEntry {
    pub identifier: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEntry {
    /// Feature root, e.g. `/v1` or `/billing/v2`.
    pub root: String,

    #[serde(default)]
    pub endpoints: Vec<EndpointEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointEntry {
    pub method: HttpMethod,
    pub path: String,

    #[serde(default = "default_ownership")]
    pub ownership: Ownership,

    /// Required for (and only allowed on) private endpoints.
    #[serde(default)]
    pub owner_param_index: Option<usize>,

    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_ownership() -> Ownership {
    Ownership::Organization
}

impl ServiceManifest {
    pub fn load(path: &Path) -> Result<Self, EndpointError> {
        let content = std::fs::read_to_string(path).map_err(|source| EndpointError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, EndpointError> {
        Ok(toml::from_str(content)?)
    }

    /// Replay the manifest through a fresh registry, so every entry gets
    /// the same validation as a hand-written declaration.
    pub fn into_registry(self) -> Result<EndpointRegistry, EndpointError> {
        let mut registry = EndpointRegistry::new(&self.host)?;
        for scope in self.scopes {
            registry.add_scope(scope.identifier, scope.description)?;
        }
        for feature in &self.features {
            let mut declarer = registry.feature(&feature.root);
            for entry in &feature.endpoints {
                let scopes: Vec<&str> = entry.scopes.iter().map(String::as_str).collect();
                declarer.declare_with_index(
                    entry.ownership,
                    entry.method,
                    &entry.path,
                    entry.owner_param_index,
                    &scopes,
                )?;
            }
        }
        tracing::info!(
            host = %registry.host(),
            scopes = registry.scopes().len(),
            endpoints = registry.len(),
            "loaded service manifest"
        );
        Ok(registry)
    }
}
