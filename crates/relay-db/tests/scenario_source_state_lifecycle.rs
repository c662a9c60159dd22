//! mark_success followed by get shows error_count = 0
//! and last_success set. Also exercises daily-counter reset and due-source
//! selection ordering.
//!
//! Requires RELAY_DATABASE_URL; skips gracefully when absent.

use relay_db::SourceStateRepo;
use uuid::Uuid;

#[tokio::test]
async fn mark_success_resets_error_count_and_sets_last_success() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let repo = SourceStateRepo::new(pool);

    let source = format!("s-{}", Uuid::new_v4());
    repo.mark_error(&source, "boom").await?;
    let after_error = repo.get(&source).await?.unwrap();
    assert_eq!(after_error.error_count, 1);

    repo.mark_success(&source, 3).await?;
    let after_success = repo.get(&source).await?.unwrap();
    assert_eq!(after_success.error_count, 0);
    assert!(after_success.last_success.is_some());
    assert_eq!(after_success.posts_today, 3);
    Ok(())
}

#[tokio::test]
async fn transient_error_updates_last_check_never_error_count() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let repo = SourceStateRepo::new(pool);

    let source = format!("s-{}", Uuid::new_v4());
    repo.mark_transient_error(&source, "timeout").await?;
    let state = repo.get(&source).await?.unwrap();
    assert_eq!(state.error_count, 0);
    assert!(state.last_check.is_some());

    repo.mark_transient_error(&source, "timeout again").await?;
    let state = repo.get(&source).await?.unwrap();
    assert_eq!(state.error_count, 0);
    Ok(())
}

#[tokio::test]
async fn sources_due_orders_nulls_first_then_oldest_last_check() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let repo = SourceStateRepo::new(pool);

    let never_checked = format!("s-never-{}", Uuid::new_v4());
    let checked_long_ago = format!("s-old-{}", Uuid::new_v4());

    repo.ensure_exists(&never_checked).await?;
    repo.mark_success(&checked_long_ago, 0).await?;

    let due = repo.sources_due(0, 100).await?;
    let positions: Vec<&str> = due
        .iter()
        .filter(|r| r.source_id == never_checked || r.source_id == checked_long_ago)
        .map(|r| r.source_id.as_str())
        .collect();

    assert_eq!(positions.first(), Some(&never_checked.as_str()));
    Ok(())
}
