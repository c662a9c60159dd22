//! The durable state store: connection management plus four narrow
//! repositories (published posts, source state, activity log, edit-detection
//! buffer). No other crate issues SQL directly — this is the sole SQL
//! surface.

pub mod activity_log;
pub mod edit_buffer;
pub mod published_posts;
pub mod source_state;

pub use activity_log::ActivityLogRepo;
pub use edit_buffer::EditBufferRepo;
pub use published_posts::PublishedPostsRepo;
pub use source_state::SourceStateRepo;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub const ENV_DB_URL: &str = "RELAY_DATABASE_URL";

/// Connect to Postgres using `RELAY_DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Test helper: connect using `RELAY_DATABASE_URL` and ensure migrations are
/// applied before handing the pool to a test.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Run embedded SQLx migrations. Applied explicitly by `relay migrate` and by
/// test setup — never implicitly on a hot path.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_source_state_table: bool,
}

/// Connectivity + schema presence check, used by `relay status` and the
/// daemon's `/v1/health`.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'source_state'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_source_state_table: exists,
    })
}

/// A thin facade aggregating the four repositories over one shared pool.
/// Useful aggregation boundary for callers (pipeline, CLI) that need all
/// four without wiring each repo separately.
#[derive(Clone)]
pub struct Store {
    pub published_posts: PublishedPostsRepo,
    pub source_state: SourceStateRepo,
    pub activity_log: ActivityLogRepo,
    pub edit_buffer: EditBufferRepo,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self {
            published_posts: PublishedPostsRepo::new(pool.clone()),
            source_state: SourceStateRepo::new(pool.clone()),
            activity_log: ActivityLogRepo::new(pool.clone()),
            edit_buffer: EditBufferRepo::new(pool),
        }
    }
}
