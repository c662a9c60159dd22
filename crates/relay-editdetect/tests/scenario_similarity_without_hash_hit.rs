//! Similarity match without a hash hit. Item A's text differs
//! just enough from item B's (reordered, punctuated) that their SHA-256
//! hashes disagree, but their 3-word-shingle Jaccard similarity clears the
//! 0.80 threshold, so the engine still triggers the update path.
//!
//! Requires RELAY_DATABASE_URL; skips gracefully when absent.

use relay_db::EditBufferRepo;
use relay_editdetect::{decide_for_item, hash, normalize, Decision};
use uuid::Uuid;

#[tokio::test]
async fn near_duplicate_wording_triggers_update_via_similarity_path() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let buffer = EditBufferRepo::new(pool);

    let source = format!("s-{}", Uuid::new_v4());
    let username = format!("user-{}", Uuid::new_v4());

    let text_a = "The cat sat on the mat today";
    let text_b = "Today, the cat sat on the mat!";

    let norm_a = normalize(text_a);
    let norm_b = normalize(text_b);
    assert_ne!(
        hash(&norm_a),
        hash(&norm_b),
        "fixture must exercise the similarity path, not the exact-hash path"
    );

    buffer
        .add(
            &source,
            "p1",
            &username,
            &norm_a,
            &hash(&norm_a),
            Some("d700"),
        )
        .await?;

    let decision = decide_for_item(&buffer, &source, "p2", &username, text_b).await;
    assert_eq!(
        decision,
        Decision::UpdateExisting {
            downstream_status_id: Some("d700".to_string()),
            superseded_post_id: "p1".to_string(),
        }
    );
    Ok(())
}

#[tokio::test]
async fn unrelated_text_within_window_falls_through_to_publish_new() -> anyhow::Result<()> {
    let Ok(_) = std::env::var(relay_db::ENV_DB_URL) else {
        eprintln!("SKIP: RELAY_DATABASE_URL not set");
        return Ok(());
    };
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    let buffer = EditBufferRepo::new(pool);

    let source = format!("s-{}", Uuid::new_v4());
    let username = format!("user-{}", Uuid::new_v4());

    let norm_a = normalize("the cat sat on the mat");
    buffer
        .add(&source, "p1", &username, &norm_a, &hash(&norm_a), Some("d1"))
        .await?;

    let decision = decide_for_item(
        &buffer,
        &source,
        "p2",
        &username,
        "a completely unrelated sentence about quarterly earnings",
    )
    .await;
    assert_eq!(decision, Decision::PublishNew);
    Ok(())
}
