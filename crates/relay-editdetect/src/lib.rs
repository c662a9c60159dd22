//! Edit-detection engine.
//!
//! Recognizes "delete and repost" duplicates on platforms without native
//! edit semantics and decides whether an incoming item should publish a
//! new downstream status, update one already published, or be skipped as
//! an older version of something already seen.

mod decision;
mod normalize;

pub use decision::{is_newer, Decision};
pub use normalize::{hash, jaccard_shingle_similarity, normalize};

use relay_db::EditBufferRepo;

const SIMILARITY_WINDOW_SECS: i64 = 3600;

/// Runs the full decision algorithm for an incoming item, fetching the
/// exact-hash and recent-similarity candidates from `buffer` itself.
///
/// On a similarity-lookup failure (`find_recent` erroring), this logs the
/// error and falls back to [`Decision::PublishNew`] — false negatives are
/// preferred over false positives, per the engine's failure semantics.
pub async fn decide_for_item(
    buffer: &EditBufferRepo,
    source_id: &str,
    post_id: &str,
    username: &str,
    text: &str,
) -> Decision {
    let norm = normalize(text);
    let text_hash = hash(&norm);

    let exact_match = match buffer.find_by_hash(username, &text_hash).await {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(source_id, post_id, error = %err, "edit-detection exact-hash lookup failed");
            None
        }
    };

    if let Some((prev_post_id, _)) = &exact_match {
        if prev_post_id == post_id {
            return Decision::PublishNew;
        }
    }

    let recent = if exact_match.is_some() {
        Vec::new()
    } else {
        match buffer.find_recent(username, SIMILARITY_WINDOW_SECS).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(source_id, post_id, error = %err, "edit-detection similarity lookup failed; publishing new");
                Vec::new()
            }
        }
    };

    decision::decide(post_id, &norm, exact_match, &recent)
}
