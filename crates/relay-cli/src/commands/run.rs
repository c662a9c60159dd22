//! `relay run` — one orchestrator pass over every registered, due source.

use std::path::PathBuf;

use anyhow::Result;
use relay_config::secrets::resolve_secrets;
use relay_config::consumption::RunMode;
use relay_db::Store;
use relay_runtime::{Orchestrator, SourceHandle};

use super::adapters::{build_publisher, build_source};
use super::load_config;

pub async fn run_start(config_paths: &[String], fixture_dir: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let loaded = load_config(config_paths, RunMode::Cli)?;
    let secrets = resolve_secrets(&loaded.config)?;

    let pool = relay_db::connect_from_env().await?;
    let store = Store::new(pool);

    let mut handles = Vec::with_capacity(loaded.config.sources.len());
    for source_cfg in &loaded.config.sources {
        let upstream = build_source(source_cfg, fixture_dir.as_deref());
        let publisher = build_publisher(source_cfg, secrets.token_for(&source_cfg.id), dry_run)?;
        handles.push(SourceHandle {
            config: source_cfg.clone(),
            source: upstream,
            publisher,
        });
    }

    let orchestrator = Orchestrator::new(store, loaded.config.global.clone(), handles);
    let report = orchestrator.run_once().await?;

    for result in &report.results {
        println!(
            "source={} platform={} state={} fetched={} published={} updated={} skipped={}{}",
            result.source_id,
            result.platform,
            result.outcome.state_name,
            result.outcome.fetched,
            result.outcome.published,
            result.outcome.updated,
            result.outcome.skipped,
            result
                .outcome
                .error
                .as_ref()
                .map(|e| format!(" error=\"{e}\""))
                .unwrap_or_default(),
        );
    }

    std::process::exit(report.exit_code);
}
