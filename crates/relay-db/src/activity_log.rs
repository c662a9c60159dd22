use anyhow::{Context, Result};
use relay_schemas::ActivityAction;
use serde_json::Value;
use sqlx::PgPool;

/// Append-only diagnostic stream. Adapted from a prior file-based
/// audit writer: the activity log is a table here, not a hash-chained file,
/// so there is no tamper-detection pass — only append and read-for-tests.
#[derive(Clone)]
pub struct ActivityLogRepo {
    pool: PgPool,
}

impl ActivityLogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        source_id: Option<&str>,
        action: ActivityAction,
        details: Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            insert into activity_log (source_id, action, details, created_at)
            values ($1, $2, $3, now())
            "#,
        )
        .bind(source_id)
        .bind(action.as_str())
        .bind(details)
        .execute(&self.pool)
        .await
        .context("activity_log append failed")?;
        Ok(())
    }

    /// Test/diagnostic helper: count rows for a source with a given action.
    /// The pipeline itself never reads the log ("never read from
    /// inside the pipeline").
    pub async fn count_for(&self, source_id: &str, action: ActivityAction) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as(
            r#"
            select count(*)::bigint
            from activity_log
            where source_id = $1 and action = $2
            "#,
        )
        .bind(source_id)
        .bind(action.as_str())
        .fetch_one(&self.pool)
        .await
        .context("activity_log count_for failed")?;
        Ok(n)
    }
}
