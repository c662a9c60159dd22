//! End-to-end `run_source` scenarios against a real database:
//!
//! - S1's assertion that a fresh publish leaves exactly one `publish` row
//!   and exactly one `skip` row (for a filtered-out reply) in `activity_log`.
//! - The not-found/edit-not-allowed reconciliation path: an edit targeting a
//!   downstream status that was deleted out-of-band republishes as new
//!   instead of hard-erroring the source run.
//!
//! Requires RELAY_DATABASE_URL; skips gracefully when absent.

use chrono::Utc;

use relay_config::{
    FilteringConfig, SourceConfig, TargetConfig, ThreadHandlingConfig, ThreadHandlingMode,
};
use relay_pipeline::run_source;
use relay_publish::PublisherAdapter;
use relay_publish_mock::MockPublisher;
use relay_schemas::ActivityAction;
use relay_sources::fixture::FixtureSource;
use relay_thread::ThreadCache;

fn source_config(id: &str) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        platform: "mastodon".to_string(),
        enabled: true,
        handle: None,
        feed_url: None,
        target: TargetConfig { account_id: "acct".to_string(), base_url: None, token_env: None },
        priority: None,
        interval_minutes: Some(0),
        max_posts_per_run: 10,
        skip_hours: vec![],
        filtering: FilteringConfig { skip_replies: true, ..Default::default() },
        thread_handling: ThreadHandlingConfig { mode: ThreadHandlingMode::Standalone },
        visibility: "public".to_string(),
        daily_post_cap: None,
        extra: Default::default(),
    }
}

#[tokio::test]
async fn fresh_publish_and_filtered_reply_each_log_exactly_one_row() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let store = relay_db::Store::new(pool);

    let source_id = relay_testkit::unique_source_id("s");
    let config = source_config(&source_id);
    let publisher = MockPublisher::new();

    let mut standalone = relay_testkit::post_fixture(
        "p1",
        &format!("author-{source_id}"),
        "hello world",
        Utc::now(),
    );
    standalone.is_reply = false;
    let mut reply = relay_testkit::post_fixture(
        "p2",
        &format!("author-{source_id}"),
        "a reply nobody should relay",
        Utc::now(),
    );
    reply.is_reply = true;

    let source = FixtureSource::new(source_id.clone(), vec![standalone, reply]);
    let mut thread_cache = ThreadCache::new();

    let outcome = run_source(
        &store,
        &source,
        &publisher,
        &config,
        5,
        &mut thread_cache,
        Utc::now().date_naive(),
        12,
        None,
    )
    .await;

    assert_eq!(outcome.published, 1);
    assert_eq!(outcome.filtered_out, 1);
    assert!(outcome.error.is_none());

    let publish_rows = store.activity_log.count_for(&source_id, ActivityAction::Publish).await?;
    assert_eq!(publish_rows, 1, "exactly one publish row for the standalone item");

    let skip_rows = store.activity_log.count_for(&source_id, ActivityAction::Skip).await?;
    assert_eq!(skip_rows, 1, "exactly one skip row for the filtered-out reply");

    Ok(())
}

#[tokio::test]
async fn edit_of_deleted_downstream_status_reconciles_as_publish_new() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let store = relay_db::Store::new(pool);

    let source_id = relay_testkit::unique_source_id("s");
    let config = source_config(&source_id);
    let publisher = MockPublisher::new();
    let username = format!("author-{source_id}");

    // Run 1: publish the original version of the post.
    let original = relay_testkit::post_fixture("p1", &username, "launch day announcement", Utc::now());
    let source1 = FixtureSource::new(source_id.clone(), vec![original]);
    let mut thread_cache = ThreadCache::new();
    let first = run_source(
        &store,
        &source1,
        &publisher,
        &config,
        5,
        &mut thread_cache,
        Utc::now().date_naive(),
        12,
        None,
    )
    .await;
    assert_eq!(first.published, 1);
    assert_eq!(publisher.published_count(), 1);

    // Simulate the downstream moderator deleting the status out-of-band.
    publisher.delete("1").await.expect("delete the only published status");

    // Run 2: an edited version of the same post arrives. Edit-detection
    // matches it to the buffered original (same normalized text) and routes
    // it to update_existing("1"), but "1" no longer accepts edits, so the
    // source must reconcile by republishing fresh rather than erroring out.
    let edited = relay_testkit::post_fixture("p2", &username, "launch day announcement", Utc::now());
    let source2 = FixtureSource::new(source_id.clone(), vec![edited]);
    let second = run_source(
        &store,
        &source2,
        &publisher,
        &config,
        5,
        &mut thread_cache,
        Utc::now().date_naive(),
        12,
        None,
    )
    .await;

    assert!(second.error.is_none(), "reconciliation must not hard-error the run");
    assert_eq!(second.published, 1, "the reconciled item counts as a fresh publish");
    assert_eq!(second.updated, 0);
    assert_eq!(publisher.published_count(), 1, "original was deleted; only the reconciled republish is live");

    let publish_rows = store.activity_log.count_for(&source_id, ActivityAction::Publish).await?;
    assert_eq!(publish_rows, 2, "one publish row per run: the original, then the reconciled republish");

    Ok(())
}
