//! The orchestrator: selects due sources, bounds per-platform concurrency,
//! and drives each source's pipeline to completion.
//!
//! One `Orchestrator::run_once` call is one scheduler pass: it asks the
//! state store which sources are plausibly due, narrows that to the
//! sources this process actually knows how to run (registered
//! [`SourceHandle`]s), fans out per platform under a concurrency cap, and
//! returns a per-source report the caller (CLI or daemon) turns into an
//! exit code or an HTTP response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Timelike, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use relay_config::{GlobalConfig, SourceConfig};
use relay_db::source_state::SourceStateRow;
use relay_db::Store;
use relay_pipeline::{run_source, RunOutcome};
use relay_publish::PublisherAdapter;
use relay_sources::UpstreamSource;
use relay_thread::ThreadCache;

/// One source this process is wired to run: its configuration, its
/// upstream adapter, and the publisher adapter for its target account.
/// Built by the caller — the orchestrator has no idea how to construct a
/// platform adapter, it only drives whatever it is handed.
#[derive(Clone)]
pub struct SourceHandle {
    pub config: SourceConfig,
    pub source: Arc<dyn UpstreamSource>,
    pub publisher: Arc<dyn PublisherAdapter>,
}

/// Outcome of driving one source's pipeline this pass.
#[derive(Debug, Clone)]
pub struct SourceRunResult {
    pub source_id: String,
    pub platform: String,
    pub outcome: RunOutcome,
}

impl SourceRunResult {
    /// Distinct from a transient error or an ordinary skip, neither of
    /// which should flip the run's exit code.
    pub fn is_hard_error(&self) -> bool {
        self.outcome.state_name == "Errored"
    }
}

/// Full report of one orchestrator pass.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: Vec<SourceRunResult>,
    /// `0` if every source reported success or a transient-only error,
    /// `1` if at least one source reported a hard error.
    pub exit_code: i32,
}

/// Drives scheduling for a fixed set of registered sources against one
/// shared state store. Construct once per process (or once per run, for
/// a one-shot CLI invocation) and call [`Orchestrator::run_once`].
pub struct Orchestrator {
    store: Store,
    global: GlobalConfig,
    handles: Vec<SourceHandle>,
}

impl Orchestrator {
    pub fn new(store: Store, global: GlobalConfig, handles: Vec<SourceHandle>) -> Self {
        Self { store, global, handles }
    }

    /// One scheduling pass over every registered, enabled source.
    ///
    /// 1. Ensures every registered source has a `source_state` row, so a
    ///    never-before-seen source is visible to `sources_due`.
    /// 2. Pulls coarse candidates via `sources_due(global.min_interval_minutes,
    ///    global.limit)`, then narrows to sources that are actually due under
    ///    their own effective interval and not `disabled_at`-gated.
    /// 3. Groups the due set by platform and runs each group under a
    ///    `per_platform_concurrency` semaphore.
    /// 4. Applies the run-level deadline: a source whose turn comes up after
    ///    the deadline has passed is left for the next run rather than
    ///    started (cooperative cancellation, checked between sources — never
    ///    mid-publish).
    /// 5. Reaps edit-detection buffer rows past `edit_buffer_retention_hours`
    ///    (§3's "rows older than the retention horizon are eligible for
    ///    deletion") — once per pass, not per source.
    pub async fn run_once(&self) -> Result<RunReport> {
        for handle in &self.handles {
            if handle.config.enabled {
                self.store.source_state.ensure_exists(&handle.config.id).await?;
            }
        }

        let due_rows = self
            .store
            .source_state
            .sources_due(self.global.min_interval_minutes, self.global.limit)
            .await?;
        let due_by_id: HashMap<String, SourceStateRow> =
            due_rows.into_iter().map(|r| (r.source_id.clone(), r)).collect();

        let now = Utc::now();
        let due_handles: Vec<SourceHandle> = self
            .handles
            .iter()
            .filter(|h| h.config.enabled)
            .filter(|h| {
                due_by_id
                    .get(&h.config.id)
                    .map(|row| is_due(row, h.config.effective_interval_minutes(), now))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let mut by_platform: HashMap<String, Vec<SourceHandle>> = HashMap::new();
        for handle in due_handles {
            by_platform.entry(handle.config.platform.clone()).or_default().push(handle);
        }

        let deadline = Instant::now() + Duration::from_secs(self.global.run_deadline_secs as u64);
        let per_platform_cap = self.global.per_platform_concurrency.max(1) as usize;

        let mut results = Vec::new();
        for (platform, handles) in by_platform {
            let platform_results = self.run_platform_group(platform, handles, per_platform_cap, deadline).await;
            results.extend(platform_results);
        }

        match self.store.edit_buffer.cleanup(self.global.edit_buffer_retention_hours).await {
            Ok(deleted) if deleted > 0 => {
                tracing::info!(deleted, "edit-detection buffer rows past retention horizon reaped");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "edit-detection buffer cleanup failed"),
        }

        let exit_code = if results.iter().any(SourceRunResult::is_hard_error) { 1 } else { 0 };

        for r in &results {
            tracing::info!(
                source_id = %r.source_id,
                platform = %r.platform,
                state = r.outcome.state_name,
                fetched = r.outcome.fetched,
                filtered_out = r.outcome.filtered_out,
                published = r.outcome.published,
                updated = r.outcome.updated,
                skipped = r.outcome.skipped,
                error = r.outcome.error.as_deref().unwrap_or(""),
                "source run complete"
            );
        }

        Ok(RunReport { results, exit_code })
    }

    async fn run_platform_group(
        &self,
        platform: String,
        handles: Vec<SourceHandle>,
        concurrency_cap: usize,
        deadline: Instant,
    ) -> Vec<SourceRunResult> {
        let semaphore = Arc::new(Semaphore::new(concurrency_cap));
        let store = self.store.clone();
        let critical_error_count = self.global.critical_error_count;

        let today = now_utc_date();
        let local_hour = local_hour_now();

        let mut join_set: JoinSet<SourceRunResult> = JoinSet::new();

        for handle in handles {
            if Instant::now() >= deadline {
                tracing::info!(source_id = %handle.config.id, "run deadline already reached; leaving for next pass");
                continue;
            }

            let semaphore = semaphore.clone();
            let store = store.clone();
            let platform = platform.clone();

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                let mut thread_cache = ThreadCache::new();
                let outcome = run_source(
                    &store,
                    handle.source.as_ref(),
                    handle.publisher.as_ref(),
                    &handle.config,
                    critical_error_count,
                    &mut thread_cache,
                    today,
                    local_hour,
                    Some(deadline),
                )
                .await;

                SourceRunResult { source_id: handle.config.id.clone(), platform, outcome }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(join_err) => {
                    tracing::error!(error = %join_err, "source pipeline task panicked");
                }
            }
        }
        results
    }
}

/// Whether `row` is due under `interval_minutes`: never checked, or
/// `now - last_check >= interval_minutes`.
fn is_due(row: &SourceStateRow, interval_minutes: i64, now: DateTime<Utc>) -> bool {
    if row.is_disabled() {
        return false;
    }
    match row.last_check {
        None => true,
        Some(last_check) => now - last_check >= chrono::Duration::minutes(interval_minutes),
    }
}

fn now_utc_date() -> chrono::NaiveDate {
    Utc::now().date_naive()
}

fn local_hour_now() -> u8 {
    chrono::Local::now().hour() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(last_check: Option<DateTime<Utc>>, disabled: bool) -> SourceStateRow {
        SourceStateRow {
            source_id: "s1".to_string(),
            last_check,
            last_success: None,
            posts_today: 0,
            last_reset: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
            error_count: 0,
            last_error: None,
            disabled_at: if disabled { Some(Utc::now()) } else { None },
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn never_checked_source_is_due() {
        assert!(is_due(&row(None, false), 20, Utc::now()));
    }

    #[test]
    fn disabled_source_is_never_due() {
        assert!(!is_due(&row(None, true), 20, Utc::now()));
    }

    #[test]
    fn source_checked_within_interval_is_not_due() {
        let now = Utc::now();
        let last_check = now - chrono::Duration::minutes(5);
        assert!(!is_due(&row(Some(last_check), false), 20, now));
    }

    #[test]
    fn source_checked_past_interval_is_due() {
        let now = Utc::now();
        let last_check = now - chrono::Duration::minutes(21);
        assert!(is_due(&row(Some(last_check), false), 20, now));
    }

    #[test]
    fn source_checked_exactly_at_interval_boundary_is_due() {
        let now = Utc::now();
        let last_check = now - chrono::Duration::minutes(20);
        assert!(is_due(&row(Some(last_check), false), 20, now));
    }
}
