//! `relay source list` / `relay source show` — read-only inspection of
//! configured sources joined with their durable `source_state` row.

use anyhow::Result;
use relay_config::consumption::RunMode;
use relay_db::SourceStateRepo;

use super::load_config;

pub async fn source_list(config_paths: &[String]) -> Result<()> {
    let loaded = load_config(config_paths, RunMode::Cli)?;
    let pool = relay_db::connect_from_env().await?;
    let repo = SourceStateRepo::new(pool);

    for source in &loaded.config.sources {
        let row = repo.get(&source.id).await?;
        println!(
            "id={} platform={} enabled={} interval_min={} last_check={} error_count={} disabled={}",
            source.id,
            source.platform,
            source.enabled,
            source.effective_interval_minutes(),
            row.as_ref()
                .and_then(|r| r.last_check)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string()),
            row.as_ref().map(|r| r.error_count).unwrap_or(0),
            row.as_ref().map(|r| r.is_disabled()).unwrap_or(false),
        );
    }

    Ok(())
}

pub async fn source_show(config_paths: &[String], source_id: &str) -> Result<()> {
    let loaded = load_config(config_paths, RunMode::Cli)?;
    let Some(source) = loaded.config.sources.iter().find(|s| s.id == source_id) else {
        anyhow::bail!("no source configured with id '{source_id}'");
    };

    let pool = relay_db::connect_from_env().await?;
    let repo = SourceStateRepo::new(pool);
    let row = repo.get(source_id).await?;

    println!("{}", serde_json::to_string_pretty(source)?);
    match row {
        Some(row) => println!(
            "source_state: last_check={:?} last_success={:?} posts_today={} error_count={} disabled_at={:?}",
            row.last_check, row.last_success, row.posts_today, row.error_count, row.disabled_at,
        ),
        None => println!("source_state: no row yet (never fetched)"),
    }

    Ok(())
}
