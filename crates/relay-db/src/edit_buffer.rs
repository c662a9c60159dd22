use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct EditBufferRow {
    pub source_id: String,
    pub post_id: String,
    pub username: String,
    pub text_normalized: String,
    pub text_hash: Option<String>,
    pub downstream_status_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct EditBufferRepo {
    pool: PgPool,
}

impl EditBufferRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert on `(source_id, post_id)`; on conflict, replace normalized
    /// text + hash; `downstream_id` is fill-forward (never overwrites an
    /// existing non-null value).
    pub async fn add(
        &self,
        source_id: &str,
        post_id: &str,
        username: &str,
        normalized: &str,
        hash: &str,
        downstream_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            insert into edit_detection_buffer
                (source_id, post_id, username, text_normalized, text_hash, downstream_status_id, created_at)
            values ($1, $2, $3, $4, $5, $6, now())
            on conflict (source_id, post_id) do update
                set text_normalized      = excluded.text_normalized,
                    text_hash            = excluded.text_hash,
                    downstream_status_id = coalesce(edit_detection_buffer.downstream_status_id, excluded.downstream_status_id)
            "#,
        )
        .bind(source_id)
        .bind(post_id)
        .bind(username)
        .bind(normalized)
        .bind(hash)
        .bind(downstream_id)
        .execute(&self.pool)
        .await
        .context("edit_buffer add failed")?;
        Ok(())
    }

    /// Only considers rows younger than 1h.
    pub async fn find_by_hash(
        &self,
        username: &str,
        hash: &str,
    ) -> Result<Option<(String, Option<String>)>> {
        let row: Option<(String, Option<String>)> = sqlx::query_as(
            r#"
            select post_id, downstream_status_id
            from edit_detection_buffer
            where username = $1
              and text_hash = $2
              and created_at >= now() - interval '1 hour'
            order by created_at desc
            limit 1
            "#,
        )
        .bind(username)
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .context("find_by_hash failed")?;
        Ok(row)
    }

    /// For similarity search; capped at the 10 most recent rows within
    /// `window_sec` seconds.
    pub async fn find_recent(&self, username: &str, window_sec: i64) -> Result<Vec<EditBufferRow>> {
        let rows = sqlx::query(
            r#"
            select source_id, post_id, username, text_normalized, text_hash,
                   downstream_status_id, created_at
            from edit_detection_buffer
            where username = $1
              and created_at >= now() - make_interval(secs => $2)
            order by created_at desc
            limit 10
            "#,
        )
        .bind(username)
        .bind(window_sec as f64)
        .fetch_all(&self.pool)
        .await
        .context("find_recent failed")?;

        rows.into_iter().map(row_to_buffer_row).collect()
    }

    pub async fn supersede(&self, source_id: &str, post_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            delete from edit_detection_buffer
            where source_id = $1 and post_id = $2
            "#,
        )
        .bind(source_id)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .context("supersede failed")?;
        Ok(())
    }

    /// Delete rows older than `retention_hours`; returns the count deleted.
    pub async fn cleanup(&self, retention_hours: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            delete from edit_detection_buffer
            where created_at < now() - make_interval(hours => $1)
            "#,
        )
        .bind(retention_hours as i32)
        .execute(&self.pool)
        .await
        .context("cleanup failed")?;
        Ok(result.rows_affected())
    }
}

fn row_to_buffer_row(row: sqlx::postgres::PgRow) -> Result<EditBufferRow> {
    Ok(EditBufferRow {
        source_id: row.try_get("source_id")?,
        post_id: row.try_get("post_id")?,
        username: row.try_get("username")?,
        text_normalized: row.try_get("text_normalized")?,
        text_hash: row.try_get("text_hash")?,
        downstream_status_id: row.try_get("downstream_status_id")?,
        created_at: row.try_get("created_at")?,
    })
}
