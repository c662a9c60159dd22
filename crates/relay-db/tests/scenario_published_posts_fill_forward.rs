//! is_published reflects mark_published, and
//! concurrent/repeated mark_published calls fill forward rather than
//! overwrite with null.
//!
//! Requires RELAY_DATABASE_URL; skips gracefully when absent.

use relay_db::PublishedPostsRepo;
use uuid::Uuid;

#[tokio::test]
async fn is_published_reflects_mark_published() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let repo = PublishedPostsRepo::new(pool);

    let source = format!("s-{}", Uuid::new_v4());
    let post = "p1";

    assert!(!repo.is_published(&source, post).await?);

    repo.mark_published(&source, post, "http://x/p1", Some("d100"), None)
        .await?;

    assert!(repo.is_published(&source, post).await?);
    Ok(())
}

#[tokio::test]
async fn mark_published_fills_forward_without_overwriting() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let repo = PublishedPostsRepo::new(pool);

    let source = format!("s-{}", Uuid::new_v4());
    let post = "p1";

    // First caller supplies downstream_id but no platform_uri.
    repo.mark_published(&source, post, "http://x/p1", Some("d100"), None)
        .await?;
    // Second caller supplies platform_uri but a different (should-be-ignored) downstream_id.
    repo.mark_published(
        &source,
        post,
        "http://x/p1",
        Some("d999-should-not-win"),
        Some("at://uri/p1"),
    )
    .await?;

    let row = repo
        .find_by_platform_uri(&source, "at://uri/p1")
        .await?
        .expect("row must be findable by the newly-filled platform_uri");
    assert_eq!(row.downstream_status_id.as_deref(), Some("d100"));
    assert_eq!(row.platform_uri.as_deref(), Some("at://uri/p1"));
    Ok(())
}

#[tokio::test]
async fn mark_updated_preserves_downstream_identity_across_edit() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let repo = PublishedPostsRepo::new(pool);

    let source = format!("s-{}", Uuid::new_v4());
    repo.mark_published(&source, "p1", "http://x/p1", Some("d100"), None)
        .await?;

    repo.mark_updated("d100", "p2", Some("http://x/p2")).await?;

    assert!(!repo.is_published(&source, "p1").await?);
    assert!(repo.is_published(&source, "p2").await?);
    Ok(())
}
