use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct SourceStateRow {
    pub source_id: String,
    pub last_check: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub posts_today: i32,
    pub last_reset: NaiveDate,
    pub error_count: i32,
    pub last_error: Option<String>,
    pub disabled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SourceStateRow {
    pub fn is_disabled(&self) -> bool {
        self.disabled_at.is_some()
    }
}

#[derive(Clone)]
pub struct SourceStateRepo {
    pool: PgPool,
}

impl SourceStateRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, source_id: &str) -> Result<Option<SourceStateRow>> {
        let row = sqlx::query(
            r#"
            select source_id, last_check, last_success, posts_today, last_reset,
                   error_count, last_error, disabled_at, updated_at
            from source_state
            where source_id = $1
            "#,
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await
        .context("source_state get failed")?;

        row.map(row_to_source_state).transpose()
    }

    /// Upsert on successful fetch: sets `last_check = last_success = now()`,
    /// resets `error_count` to 0, clears `last_error`. `posts_today` resets
    /// to `posts_published` if `last_reset < today`, else accumulates.
    pub async fn mark_success(&self, source_id: &str, posts_published: i32) -> Result<()> {
        sqlx::query(
            r#"
            insert into source_state
                (source_id, last_check, last_success, posts_today, last_reset,
                 error_count, last_error, updated_at)
            values ($1, now(), now(), $2, current_date, 0, null, now())
            on conflict (source_id) do update
                set last_check   = now(),
                    last_success = now(),
                    posts_today  = case
                        when source_state.last_reset < current_date then excluded.posts_today
                        else source_state.posts_today + $2
                    end,
                    last_reset   = current_date,
                    error_count  = 0,
                    last_error   = null,
                    updated_at   = now()
            "#,
        )
        .bind(source_id)
        .bind(posts_published)
        .execute(&self.pool)
        .await
        .context("mark_success failed")?;
        Ok(())
    }

    /// Upsert on a hard error: sets `last_check = now()`, increments
    /// `error_count`, records `last_error`. Does not touch `posts_today`.
    pub async fn mark_error(&self, source_id: &str, msg: &str) -> Result<()> {
        sqlx::query(
            r#"
            insert into source_state
                (source_id, last_check, posts_today, last_reset, error_count, last_error, updated_at)
            values ($1, now(), 0, current_date, 1, $2, now())
            on conflict (source_id) do update
                set last_check  = now(),
                    error_count = source_state.error_count + 1,
                    last_error  = $2,
                    updated_at  = now()
            "#,
        )
        .bind(source_id)
        .bind(msg)
        .execute(&self.pool)
        .await
        .context("mark_error failed")?;
        Ok(())
    }

    /// Transient errors update `last_check` only — they never count against
    /// the consecutive-error budget.
    pub async fn mark_transient_error(&self, source_id: &str, msg: &str) -> Result<()> {
        sqlx::query(
            r#"
            insert into source_state
                (source_id, last_check, posts_today, last_reset, error_count, last_error, updated_at)
            values ($1, now(), 0, current_date, 0, $2, now())
            on conflict (source_id) do update
                set last_check = now(),
                    last_error = $2,
                    updated_at = now()
            "#,
        )
        .bind(source_id)
        .bind(msg)
        .execute(&self.pool)
        .await
        .context("mark_transient_error failed")?;
        Ok(())
    }

    /// Ensure a row exists for `source_id` so a never-fetched source is
    /// visible to `sources_due` (a source with no row at all is otherwise
    /// invisible to the `last_check is null` check). No-op if already
    /// present.
    pub async fn ensure_exists(&self, source_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            insert into source_state (source_id, posts_today, last_reset, error_count)
            values ($1, 0, current_date, 0)
            on conflict (source_id) do nothing
            "#,
        )
        .bind(source_id)
        .execute(&self.pool)
        .await
        .context("ensure_exists failed")?;
        Ok(())
    }

    /// Sources whose `last_check` is null or older than `now - interval_min`,
    /// ordered by `last_check` ascending, nulls first.
    pub async fn sources_due(
        &self,
        interval_min: i64,
        limit: i64,
    ) -> Result<Vec<SourceStateRow>> {
        let rows = sqlx::query(
            r#"
            select source_id, last_check, last_success, posts_today, last_reset,
                   error_count, last_error, disabled_at, updated_at
            from source_state
            where last_check is null
               or last_check < now() - make_interval(mins => $1)
            order by last_check asc nulls first
            limit $2
            "#,
        )
        .bind(interval_min as i32)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("sources_due failed")?;

        rows.into_iter().map(row_to_source_state).collect()
    }
}

fn row_to_source_state(row: sqlx::postgres::PgRow) -> Result<SourceStateRow> {
    Ok(SourceStateRow {
        source_id: row.try_get("source_id")?,
        last_check: row.try_get("last_check")?,
        last_success: row.try_get("last_success")?,
        posts_today: row.try_get("posts_today")?,
        last_reset: row.try_get("last_reset")?,
        error_count: row.try_get("error_count")?,
        last_error: row.try_get("last_error")?,
        disabled_at: row.try_get("disabled_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
