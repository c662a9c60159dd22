use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct PublishedPostRow {
    pub source_id: String,
    pub post_id: String,
    pub post_url: String,
    pub downstream_status_id: Option<String>,
    pub platform_uri: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PublishedPostsRepo {
    pool: PgPool,
}

impl PublishedPostsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn is_published(&self, source_id: &str, post_id: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            select exists (
                select 1 from published_posts where source_id = $1 and post_id = $2
            )
            "#,
        )
        .bind(source_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .context("is_published failed")?;
        Ok(exists)
    }

    pub async fn find_by_platform_uri(
        &self,
        source_id: &str,
        uri: &str,
    ) -> Result<Option<PublishedPostRow>> {
        let row = sqlx::query(
            r#"
            select source_id, post_id, post_url, downstream_status_id, platform_uri, published_at
            from published_posts
            where source_id = $1 and platform_uri = $2
            order by published_at desc
            limit 1
            "#,
        )
        .bind(source_id)
        .bind(uri)
        .fetch_optional(&self.pool)
        .await
        .context("find_by_platform_uri failed")?;

        row.map(row_to_published_post).transpose()
    }

    /// Most recent published row within the last 24h for this source, with a
    /// non-null `downstream_status_id` — the threading resolver's DB
    /// fallback.
    pub async fn find_recent_thread_parent(&self, source_id: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            select downstream_status_id
            from published_posts
            where source_id = $1
              and downstream_status_id is not null
              and published_at >= now() - interval '24 hours'
            order by published_at desc
            limit 1
            "#,
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await
        .context("find_recent_thread_parent failed")?;

        Ok(row.map(|(id,)| id))
    }

    /// Fill-forward upsert: a non-null incoming `downstream_id`/`platform_uri`
    /// replaces an existing null, never overwrites an existing value.
    pub async fn mark_published(
        &self,
        source_id: &str,
        post_id: &str,
        post_url: &str,
        downstream_id: Option<&str>,
        platform_uri: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            insert into published_posts
                (source_id, post_id, post_url, downstream_status_id, platform_uri, published_at)
            values ($1, $2, $3, $4, $5, now())
            on conflict (source_id, post_id) do update
                set downstream_status_id = coalesce(published_posts.downstream_status_id, excluded.downstream_status_id),
                    platform_uri         = coalesce(published_posts.platform_uri, excluded.platform_uri)
            "#,
        )
        .bind(source_id)
        .bind(post_id)
        .bind(post_url)
        .bind(downstream_id)
        .bind(platform_uri)
        .execute(&self.pool)
        .await
        .context("mark_published failed")?;
        Ok(())
    }

    /// Post-edit rewrite: the row identified by `downstream_id` gets its
    /// source `post_id`/`url` replaced, preserving the downstream status's
    /// identity across an upstream edit.
    pub async fn mark_updated(
        &self,
        downstream_id: &str,
        new_post_id: &str,
        new_url: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            update published_posts
               set post_id = $2,
                   post_url = coalesce($3, post_url)
             where downstream_status_id = $1
            "#,
        )
        .bind(downstream_id)
        .bind(new_post_id)
        .bind(new_url)
        .execute(&self.pool)
        .await
        .context("mark_updated failed")?;
        Ok(())
    }
}

fn row_to_published_post(row: sqlx::postgres::PgRow) -> Result<PublishedPostRow> {
    Ok(PublishedPostRow {
        source_id: row.try_get("source_id")?,
        post_id: row.try_get("post_id")?,
        post_url: row.try_get("post_url")?,
        downstream_status_id: row.try_get("downstream_status_id")?,
        platform_uri: row.try_get("platform_uri")?,
        published_at: row.try_get("published_at")?,
    })
}
