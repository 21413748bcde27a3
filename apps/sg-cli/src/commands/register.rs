// register.rs: Registration mode: declare, register, synchronize.
//
// Exits non-zero when any endpoint fails to synchronize, so a deploy step
// can refuse to route traffic to a half-registered service.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use sg_authority::{
    AccessControl, AuthorityClient, AuthorityConfig, HttpAuthority, InMemoryAuthority, SyncReport,
};
use sg_endpoint::ServiceManifest;

pub fn execute(manifest: &Path, config: Option<&Path>, dry_run: bool) -> anyhow::Result<()> {
    let client: Arc<dyn AuthorityClient> = if dry_run {
        Arc::new(InMemoryAuthority::new())
    } else {
        let config = AuthorityConfig::resolve(config).context("no usable authority configuration")?;
        tracing::info!(authority = %config.base_url, "using remote authority");
        Arc::new(HttpAuthority::new(config)?)
    };

    let report = run(manifest, client)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    report.ensure_complete()?;
    Ok(())
}

fn run(manifest: &Path, client: Arc<dyn AuthorityClient>) -> anyhow::Result<SyncReport> {
    let registry = ServiceManifest::load(manifest)?.into_registry()?;
    let mut control = AccessControl::new(registry, client);
    control.register()?;
    Ok(control.synchronize()?)
}
