//! Builds the registered [`relay_runtime::SourceHandle`]s the daemon drives,
//! from layered YAML config plus resolved secrets. Same seam as
//! `relay-cli`'s `commands::adapters` module — duplicated rather than
//! shared because the CLI is a binary-only crate with no library target.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use relay_config::secrets::resolve_secrets;
use relay_config::{LoadedConfig, SourceConfig};
use relay_publish::PublisherAdapter;
use relay_publish_http::HttpPublisher;
use relay_publish_mock::MockPublisher;
use relay_runtime::SourceHandle;
use relay_schemas::UniformPost;
use relay_sources::{fixture::FixtureSource, ProviderError, UpstreamSource};

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

fn build_source(cfg: &SourceConfig, fixture_dir: Option<&std::path::Path>) -> Arc<dyn UpstreamSource> {
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

fn build_publisher(cfg: &SourceConfig, token: Option<&str>, dry_run: bool) -> Result<Arc<dyn PublisherAdapter>> {
    if dry_run {
        return Ok(Arc::new(MockPublisher::new()));
    }

    let base_url = cfg.target.base_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!("source '{}': target.base_url is required outside dry-run", cfg.id)
    })?;
    let token = token
        .ok_or_else(|| anyhow::anyhow!("source '{}': no bearer token resolved for target", cfg.id))?;

    Ok(Arc::new(HttpPublisher::new(base_url, token)?))
}

/// `RELAY_DAEMON_DRY_RUN=1` runs every source against an in-memory mock
/// publisher instead of a live downstream instance — used for demos and
/// local smoke tests without a real ActivityPub-compatible target.
pub fn dry_run_from_env() -> bool {
    std::env::var("RELAY_DAEMON_DRY_RUN")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// `RELAY_DAEMON_FIXTURE_DIR`, when set, is where each source's
/// `<source.id>.json` fixture file is looked up, same convention as the
/// CLI's `--fixtures` flag.
pub fn fixture_dir_from_env() -> Option<PathBuf> {
    std::env::var("RELAY_DAEMON_FIXTURE_DIR").ok().map(PathBuf::from)
}

/// Build every registered source's handle from a loaded config + resolved
/// secrets.
pub fn build_handles(loaded: &LoadedConfig, dry_run: bool, fixture_dir: Option<&std::path::Path>) -> Result<Vec<SourceHandle>> {
    let secrets = resolve_secrets(&loaded.config)?;
    let mut handles = Vec::with_capacity(loaded.config.sources.len());
    for source_cfg in &loaded.config.sources {
        let upstream = build_source(source_cfg, fixture_dir);
        let publisher = build_publisher(source_cfg, secrets.token_for(&source_cfg.id), dry_run)?;
        handles.push(SourceHandle {
            config: source_cfg.clone(),
            source: upstream,
            publisher,
        });
    }
    Ok(handles)
}
