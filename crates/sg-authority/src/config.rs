//! Authority connection configuration.
//!
//! Loaded from a TOML file or from the environment:
//!
//! ```toml
//! base_url = "https://authority.internal"
//! timeout_secs = 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuthorityError, Result};

/// Environment variable holding the authority root URL.
pub const ENV_AUTHORITY_URL: &str = "SCOPEGATE_AUTHORITY_URL";
/// Environment variable overriding the request timeout, in seconds.
pub const ENV_AUTHORITY_TIMEOUT: &str = "SCOPEGATE_AUTHORITY_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Authority root, e.g. `https://authority.internal`.
    pub base_url: String,

    /// Prefix of the scope and endpoint resources.
    #[serde(default = "default_resources_prefix")]
    pub resources_prefix: String,

    /// Prefix of the permission (rules and checks) resources.
    #[serde(default = "default_permissions_prefix")]
    pub permissions_prefix: String,

    /// Per-request transport deadline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_resources_prefix() -> String {
    "/resources/v1".to_string()
}

fn default_permissions_prefix() -> String {
    "/permissions/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("scopegate/{}", env!("CARGO_PKG_VERSION"))
}

impl AuthorityConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            resources_prefix: default_resources_prefix(),
            permissions_prefix: default_permissions_prefix(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AuthorityError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `SCOPEGATE_AUTHORITY_URL` / `SCOPEGATE_AUTHORITY_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup(ENV_AUTHORITY_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AuthorityError::Config(format!("{} is not set", ENV_AUTHORITY_URL)))?;
        let mut config = Self::new(base_url);
        if let Some(raw) = lookup(ENV_AUTHORITY_TIMEOUT) {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                AuthorityError::Config(format!(
                    "{} must be a number of seconds, got '{}'",
                    ENV_AUTHORITY_TIMEOUT, raw
                ))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Prefer an explicit file, fall back to the environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::from_env(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| AuthorityError::Config(format!("base_url '{}': {}", self.base_url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AuthorityError::Config(format!(
                "base_url '{}' must be http or https",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(AuthorityError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Absolute URL of a resources path, e.g. `scopes`.
    pub fn resources_url(&self, tail: &str) -> String {
        join(&self.base_url, &[&self.resources_prefix, tail])
    }

    /// Absolute URL of a permissions path, e.g. `users/<id>`.
    pub fn permissions_url(&self, tail: &str) -> String {
        join(&self.base_url, &[&self.permissions_prefix, tail])
    }

    /// Resolve a pagination cursor (a root-relative path with query).
    pub fn cursor_url(&self, cursor: &str) -> String {
        if cursor.starts_with("http://") || cursor.starts_with("https://") {
            return cursor.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            cursor.trim_start_matches('/')
        )
    }
}

fn join(base: &str, parts: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for part in parts {
        let part = part.trim_matches('/');
        if !part.is_empty() {
            url.push('/');
            url.push_str(part);
        }
    }
    url
}
