//! Shared test fixtures: a migrated `PgPool` helper and `UniformPost`
//! builders, used by scenario tests across the workspace so each crate's
//! `tests/` directory doesn't redefine the same boilerplate.
//!
//! Every scenario test in this workspace still guards on
//! `RELAY_DATABASE_URL` being set and skips gracefully when it is absent —
//! this crate does not change that contract, it just centralizes the setup.

use chrono::{DateTime, Utc};
use relay_schemas::{Author, MediaAttachment, UniformPost};
use sqlx::PgPool;

/// Connect via `RELAY_DATABASE_URL` and apply migrations, for use as a
/// `tests/` setup helper. Callers still check `RELAY_DATABASE_URL` is set
/// before calling this, same as calling `relay_db::connect_from_env`
/// directly.
pub async fn db_pool() -> anyhow::Result<PgPool> {
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    Ok(pool)
}

/// A minimal, otherwise-default `UniformPost` fixture. Override fields on
/// the returned value for scenario-specific variations (e.g. `is_reply`,
/// `is_thread_post`, `platform_uri`).
pub fn post_fixture(id: &str, username: &str, text: &str, published_at: DateTime<Utc>) -> UniformPost {
    UniformPost {
        id: id.to_string(),
        url: format!("https://example.test/{username}/{id}"),
        text: text.to_string(),
        published_at,
        author: Author {
            username: username.to_string(),
            display_name: username.to_string(),
        },
        media: Vec::new(),
        is_repost: false,
        is_quote: false,
        is_reply: false,
        is_thread_post: false,
        reply_to_handle: None,
        platform_uri: None,
        has_video: false,
        quoted_post: None,
    }
}

/// Same as [`post_fixture`] but with a media attachment attached, for
/// exercising the publish-media path.
pub fn post_fixture_with_media(
    id: &str,
    username: &str,
    text: &str,
    published_at: DateTime<Utc>,
    media_url: &str,
) -> UniformPost {
    let mut post = post_fixture(id, username, text, published_at);
    post.media.push(MediaAttachment {
        url: media_url.to_string(),
        alt: None,
    });
    post
}

/// A unique per-test source id, so concurrent scenario tests sharing one
/// database never collide on `(source_id, post_id)`.
pub fn unique_source_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}
