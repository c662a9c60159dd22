//! S3 — thread across runs: a self-reply chain published in separate
//! orchestrator passes still resolves its downstream parent, first via the
//! state store (run 2's cache starts empty), then via the in-memory cache
//! for a later item in the same run.
//!
//! Requires RELAY_DATABASE_URL; skips gracefully when absent.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use relay_config::{
    FilteringConfig, GlobalConfig, Priority, SourceConfig, TargetConfig, ThreadHandlingConfig,
    ThreadHandlingMode,
};
use relay_publish_mock::MockPublisher;
use relay_runtime::{Orchestrator, SourceHandle};
use relay_schemas::{Author, UniformPost};
use relay_sources::fixture::FixtureSource;

fn global_config() -> GlobalConfig {
    GlobalConfig {
        min_interval_minutes: 0,
        limit: 100,
        per_platform_concurrency: 4,
        run_deadline_secs: 30,
        critical_error_count: 5,
        edit_buffer_retention_hours: 2,
    }
}

fn source_config(id: &str) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        platform: "rss".to_string(),
        enabled: true,
        handle: None,
        feed_url: None,
        target: TargetConfig { account_id: "acct".to_string(), base_url: None, token_env: None },
        priority: Some(Priority::High),
        // Always due, so the second "run" (two hours later in spec terms) is
        // due immediately without having to wait out a real interval.
        interval_minutes: Some(0),
        max_posts_per_run: 10,
        skip_hours: vec![],
        filtering: FilteringConfig::default(),
        thread_handling: ThreadHandlingConfig { mode: ThreadHandlingMode::Chain },
        visibility: "public".to_string(),
        daily_post_cap: None,
        extra: Default::default(),
    }
}

fn item(id: &str, is_thread_post: bool) -> UniformPost {
    UniformPost {
        id: id.to_string(),
        url: format!("https://example.test/{id}"),
        text: format!("hello from {id}"),
        published_at: Utc::now(),
        author: Author { username: "Alice".to_string(), display_name: "Alice".to_string() },
        media: vec![],
        is_repost: false,
        is_quote: false,
        is_reply: is_thread_post,
        is_thread_post,
        reply_to_handle: if is_thread_post { Some("alice".to_string()) } else { None },
        platform_uri: None,
        has_video: false,
        quoted_post: None,
    }
}

#[tokio::test]
async fn thread_continuation_resolves_across_and_within_runs() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let store = relay_db::Store::new(pool);

    let source_id = format!("s-{}", Uuid::new_v4());
    let cfg = source_config(&source_id);
    let publisher = Arc::new(MockPublisher::new());

    // Run 1: t1 is not a thread post.
    let source1 = Arc::new(FixtureSource::new(source_id.clone(), vec![item("t1", false)]));
    let handle1 = SourceHandle { config: cfg.clone(), source: source1, publisher: publisher.clone() };
    let orchestrator1 = Orchestrator::new(store, global_config(), vec![handle1]);
    let first = orchestrator1.run_once().await?;
    assert_eq!(first.results[0].outcome.published, 1);

    // Each orchestrator owns its own fresh thread cache per run (the
    // lifetime rule from relay-thread's docs); reuse the same store by
    // reconstructing the orchestrator, simulating "two hours later" with an
    // empty in-memory cache.
    let store2 = relay_db::connect_from_env().await.map(relay_db::Store::new)?;
    let source2 = Arc::new(FixtureSource::new(source_id.clone(), vec![item("t2", true), item("t3", true)]));
    let handle2 = SourceHandle { config: cfg.clone(), source: source2, publisher: publisher.clone() };
    let orchestrator2 = Orchestrator::new(store2, global_config(), vec![handle2]);
    let second = orchestrator2.run_once().await?;
    assert_eq!(second.results[0].outcome.published, 2, "t2 and t3 should both publish");

    // t1 is status "1" (first publish by this MockPublisher instance).
    let t1_id = "1".to_string();
    let t2_id_statuses: Vec<_> = (2u64..=3)
        .map(|n| n.to_string())
        .filter_map(|id| publisher.get(&id))
        .collect();
    assert_eq!(t2_id_statuses.len(), 2);

    // t2 (status "2") must chain from t1 via the state-store fallback.
    assert_eq!(t2_id_statuses[0].in_reply_to.as_deref(), Some(t1_id.as_str()));
    // t3 (status "3") must chain from t2 via the in-memory cache within run 2.
    assert_eq!(t2_id_statuses[1].in_reply_to.as_deref(), Some("2"));

    Ok(())
}
