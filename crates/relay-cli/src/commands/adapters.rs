//! Wiring seam between configuration and the trait objects the orchestrator
//! drives.
//!
//! Concrete platform scraping/API clients live outside this workspace (see
//! `relay-sources`'s crate docs) — this module only knows how to build a
//! [`relay_sources::fixture::FixtureSource`] from an on-disk JSON fixture,
//! or fall back to a source that reports a `Config` error so a
//! misconfigured/unimplemented platform fails loudly rather than silently
//! doing nothing.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use relay_config::SourceConfig;
use relay_publish::PublisherAdapter;
use relay_publish_http::HttpPublisher;
use relay_publish_mock::MockPublisher;
use relay_schemas::UniformPost;
use relay_sources::{fixture::FixtureSource, ProviderError, UpstreamSource};

/// Placeholder for a source whose platform has no adapter registered in this
/// process. Always reports a `Config` error — a hard error, never retried —
/// so a typo'd or not-yet-implemented platform surfaces immediately instead
/// of quietly never publishing anything.
struct UnregisteredSource {
    source_id: String,
    platform: String,
}

#[async_trait]
impl UpstreamSource for UnregisteredSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch(&self) -> Result<Vec<UniformPost>, ProviderError> {
        Err(ProviderError::Config(format!(
            "no upstream adapter registered for platform '{}'",
            self.platform
        )))
    }
}

/// Build the `UpstreamSource` for one configured source.
///
/// If `fixture_dir` is set and `<fixture_dir>/<source.id>.json` exists, that
/// file (a JSON array of `UniformPost`) becomes the source's fixed feed —
/// the seam tests and `--dry-run` invocations use. Otherwise the source
/// falls back to [`UnregisteredSource`].
pub fn build_source(cfg: &SourceConfig, fixture_dir: Option<&Path>) -> Arc<dyn UpstreamSource> {
    if let Some(dir) = fixture_dir {
        let path = dir.join(format!("{}.json", cfg.id));
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(json) => match FixtureSource::from_json(cfg.id.clone(), &json) {
                    Ok(src) => return Arc::new(src),
                    Err(err) => {
                        tracing::warn!(source_id = %cfg.id, path = %path.display(), error = %err, "fixture file did not decode; source will report a config error");
                    }
                },
                Err(err) => {
                    tracing::warn!(source_id = %cfg.id, path = %path.display(), error = %err, "failed to read fixture file");
                }
            }
        }
    }

    Arc::new(UnregisteredSource {
        source_id: cfg.id.clone(),
        platform: cfg.platform.clone(),
    })
}

/// Build the publisher adapter for one configured source's target.
///
/// `--dry-run` always uses an in-memory [`MockPublisher`] regardless of
/// `target.base_url`/token. Otherwise a live [`HttpPublisher`] is built from
/// `target.base_url` and the resolved bearer token, both of which are
/// required outside dry-run.
pub fn build_publisher(
    cfg: &SourceConfig,
    token: Option<&str>,
    dry_run: bool,
) -> Result<Arc<dyn PublisherAdapter>> {
    if dry_run {
        return Ok(Arc::new(MockPublisher::new()));
    }

    let base_url = cfg.target.base_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("source '{}': target.base_url is required outside --dry-run", cfg.id)
    })?;
    let token = token.ok_or_else(|| {
        anyhow::anyhow!("source '{}': no bearer token resolved for target", cfg.id)
    })?;

    Ok(Arc::new(HttpPublisher::new(base_url, token)?))
}
