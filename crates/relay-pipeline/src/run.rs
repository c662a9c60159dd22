//! The per-source run loop: one `run_source` call composes fetch → filter
//! → per-item edit-detection/threading → publish, driving the
//! [`crate::state::PipelineState`] machine as it goes.
//!
//! Item i must be fully recorded before item i+1 begins — a strict serial
//! constraint per source, so [`relay_thread::ThreadCache`] and
//! `find_recent_thread_parent` see a consistent picture.

use chrono::NaiveDate;

use relay_config::{SourceConfig, ThreadHandlingMode};
use relay_db::Store;
use relay_editdetect::{decide_for_item, hash, normalize};
use relay_policy::{evaluate, PolicyAction, PolicyConfig, PolicyRequest, PolicyState};
use relay_publish::{with_retry, MediaItem, PublishError, PublisherAdapter};
use relay_schemas::{ActivityAction, UniformPost, Visibility};
use relay_sources::UpstreamSource;
use relay_thread::ThreadCache;

use crate::filter::is_filtered_out;
use crate::item::{classify, ItemAction};
use crate::state::{apply, PipelineEvent, PipelineState};

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub state_name: &'static str,
    pub fetched: usize,
    pub filtered_out: usize,
    pub published: i64,
    pub updated: i64,
    pub skipped: i64,
    pub error: Option<String>,
}

fn policy_config(cfg: &SourceConfig, critical_error_count: i64) -> PolicyConfig {
    PolicyConfig {
        max_posts_per_run: cfg.max_posts_per_run,
        daily_post_cap: cfg.daily_post_cap,
        skip_hours: cfg.skip_hours.clone(),
        critical_error_count,
    }
}

fn policy_state(row: Option<&relay_db::source_state::SourceStateRow>, today: NaiveDate) -> PolicyState {
    match row {
        Some(r) => PolicyState {
            posts_today: r.posts_today as i64,
            last_reset: r.last_reset,
            error_count: r.error_count as i64,
            disabled: r.is_disabled(),
        },
        None => PolicyState { posts_today: 0, last_reset: today, error_count: 0, disabled: false },
    }
}

fn parse_visibility(s: &str) -> Visibility {
    match s {
        "unlisted" => Visibility::Unlisted,
        "private" => Visibility::Private,
        "direct" => Visibility::Direct,
        _ => Visibility::Public,
    }
}

/// Runs one source through a full pipeline pass.
///
/// `deadline`, when set, is checked between items (never mid-publish-call):
/// once passed, the loop stops early and whatever was already recorded
/// stands — remaining items are left for the next run, same as an
/// ordinary per-run budget exhaustion.
pub async fn run_source(
    store: &Store,
    source: &dyn UpstreamSource,
    publisher: &dyn PublisherAdapter,
    config: &SourceConfig,
    critical_error_count: i64,
    thread_cache: &mut ThreadCache,
    today: NaiveDate,
    local_hour: u8,
    deadline: Option<std::time::Instant>,
) -> RunOutcome {
    let source_id = config.id.as_str();
    let pcfg = policy_config(config, critical_error_count);

    let existing_state = match store.source_state.get(source_id).await {
        Ok(row) => row,
        Err(err) => {
            return RunOutcome {
                state_name: "Errored",
                error: Some(format!("source_state lookup failed: {err}")),
                ..Default::default()
            };
        }
    };
    let pstate = policy_state(existing_state.as_ref(), today);

    let fetch_decision = evaluate(&pcfg, &pstate, today, &PolicyRequest::Fetch { local_hour });
    if fetch_decision.action != PolicyAction::Proceed {
        tracing::info!(source_id, reason = fetch_decision.reason, "fetch skipped");
        return RunOutcome { state_name: "Idle", ..Default::default() };
    }

    let mut pipeline_state = PipelineState::Idle;
    pipeline_state = apply(pipeline_state, &PipelineEvent::BeginFetch).expect("idle accepts begin_fetch");

    let items = match source.fetch().await {
        Ok(items) => items,
        Err(err) => {
            return handle_fetch_error(store, source_id, err).await;
        }
    };
    pipeline_state = apply(pipeline_state, &PipelineEvent::FetchSucceeded).expect("fetch success transition");

    let mut items = items;
    items.sort_by_key(|i| i.published_at);

    let mut rejected_ids: Vec<String> = Vec::new();
    let filtered: Vec<UniformPost> = items
        .into_iter()
        .filter(|post| {
            if is_filtered_out(&config.filtering, post) {
                rejected_ids.push(post.id.clone());
                false
            } else {
                true
            }
        })
        .collect();
    let filtered_out = rejected_ids.len();
    for post_id in &rejected_ids {
        let _ = store
            .activity_log
            .append(
                Some(source_id),
                ActivityAction::Skip,
                serde_json::json!({ "post_id": post_id, "reason": "filtered" }),
            )
            .await;
    }
    pipeline_state = apply(pipeline_state, &PipelineEvent::FilterCompleted).expect("filter transition");

    let mut published = 0i64;
    let mut updated = 0i64;
    let mut skipped = 0i64;
    let mut hard_error: Option<String> = None;
    let mut transient_error: Option<String> = None;

    let mut deadline_exceeded = false;

    for post in &filtered {
        if deadline.is_some_and(|d| std::time::Instant::now() >= d) {
            deadline_exceeded = true;
            break;
        }

        let already_published = match store.published_posts.is_published(source_id, &post.id).await {
            Ok(v) => v,
            Err(err) => {
                hard_error = Some(format!("is_published check failed: {err}"));
                break;
            }
        };

        let username_lower = post.author.username.to_lowercase();
        let decision = decide_for_item(
            &store.edit_buffer,
            source_id,
            &post.id,
            &username_lower,
            &post.text,
        )
        .await;

        let action = classify(already_published, &decision);

        match action {
            ItemAction::SkipAlreadyPublished | ItemAction::SkipOlderVersion => {
                let reason = match action {
                    ItemAction::SkipAlreadyPublished => "already_published",
                    ItemAction::SkipOlderVersion => "skip_older_version",
                    _ => unreachable!(),
                };
                let _ = store
                    .activity_log
                    .append(
                        Some(source_id),
                        ActivityAction::Skip,
                        serde_json::json!({ "post_id": post.id, "reason": reason }),
                    )
                    .await;
                skipped += 1;
                continue;
            }
            ItemAction::SkipFiltered => unreachable!("filtering already removed these"),
            ItemAction::UpdateExisting { downstream_status_id, superseded_post_id } => {
                let publish_decision = evaluate(
                    &pcfg,
                    &pstate,
                    today,
                    &PolicyRequest::PublishOne { published_so_far_in_run: published + updated },
                );
                if publish_decision.action != PolicyAction::Proceed {
                    tracing::info!(source_id, reason = publish_decision.reason, "publish budget reached");
                    break;
                }

                pipeline_state = apply(pipeline_state, &PipelineEvent::BeginPublish).expect("begin publish");

                let media_ids = upload_media(publisher, post).await;
                let text = render_text(post);
                let result = with_retry("update", || publisher.update(&downstream_status_id, &text, Some(&media_ids))).await;
                match result {
                    Ok(published_ref) => {
                        if let Err(err) = store.published_posts.mark_updated(&published_ref.id, &post.id, Some(&post.url)).await {
                            hard_error = Some(format!("mark_updated failed: {err}"));
                            break;
                        }
                        record_edit_buffer(store, source_id, post, Some(&published_ref.id)).await;
                        supersede_buffer_entry(store, source_id, &superseded_post_id).await;
                        let _ = store
                            .activity_log
                            .append(
                                Some(source_id),
                                ActivityAction::Publish,
                                serde_json::json!({ "post_id": post.id, "downstream_status_id": published_ref.id, "edit": true }),
                            )
                            .await;
                        updated += 1;
                        pipeline_state = apply(pipeline_state, &PipelineEvent::ItemRecorded).expect("item recorded");
                    }
                    // Not-found / edit-not-allowed are downgraded to a warning: the
                    // downstream status this item was meant to update is gone or
                    // unreachable, so treat the item as publish_new instead of
                    // aborting the whole source run.
                    Err(PublishError::NotFound) | Err(PublishError::EditNotAllowed) => {
                        tracing::warn!(
                            source_id,
                            post_id = %post.id,
                            "update target missing or edit not allowed; reconciling as publish_new"
                        );
                        match publish_new(store, publisher, config, source_id, post, thread_cache).await {
                            Ok(()) => {
                                supersede_buffer_entry(store, source_id, &superseded_post_id).await;
                                published += 1;
                                pipeline_state = apply(pipeline_state, &PipelineEvent::ItemRecorded).expect("item recorded");
                            }
                            Err(ItemFailure::Transient(msg)) => {
                                transient_error = Some(msg);
                                break;
                            }
                            Err(ItemFailure::Hard(msg)) => {
                                hard_error = Some(msg);
                                break;
                            }
                        }
                    }
                    // Rate-limited/transient-after-retries must not increment
                    // error_count or abort the source as a hard error (§4.D).
                    Err(err) => {
                        match classify_publish_error("update", err) {
                            ItemFailure::Transient(msg) => transient_error = Some(msg),
                            ItemFailure::Hard(msg) => hard_error = Some(msg),
                        }
                        break;
                    }
                }
            }
            ItemAction::PublishNew => {
                let publish_decision = evaluate(
                    &pcfg,
                    &pstate,
                    today,
                    &PolicyRequest::PublishOne { published_so_far_in_run: published + updated },
                );
                if publish_decision.action != PolicyAction::Proceed {
                    tracing::info!(source_id, reason = publish_decision.reason, "publish budget reached");
                    break;
                }

                pipeline_state = apply(pipeline_state, &PipelineEvent::BeginPublish).expect("begin publish");

                match publish_new(store, publisher, config, source_id, post, thread_cache).await {
                    Ok(()) => {
                        published += 1;
                        pipeline_state = apply(pipeline_state, &PipelineEvent::ItemRecorded).expect("item recorded");
                    }
                    Err(ItemFailure::Transient(msg)) => {
                        transient_error = Some(msg);
                        break;
                    }
                    Err(ItemFailure::Hard(msg)) => {
                        hard_error = Some(msg);
                        break;
                    }
                }
            }
        }
    }

    if let Some(msg) = hard_error {
        let _ = store.source_state.mark_error(source_id, &msg).await;
        let _ = store
            .activity_log
            .append(Some(source_id), ActivityAction::Error, serde_json::json!({ "error": msg }))
            .await;
        return RunOutcome {
            state_name: "Errored",
            fetched: filtered.len(),
            filtered_out,
            published,
            updated,
            skipped,
            error: Some("publish failed".to_string()),
        };
    }

    // Rate-limited-after-retries and transient-after-retries publish failures:
    // same treatment as a transient fetch error — `last_check` updates,
    // `error_count` does not, and the source is not reported as `Errored`.
    if let Some(msg) = transient_error {
        let _ = store.source_state.mark_transient_error(source_id, &msg).await;
        let _ = store
            .activity_log
            .append(Some(source_id), ActivityAction::TransientError, serde_json::json!({ "error": msg }))
            .await;
        return RunOutcome {
            state_name: "Idle",
            fetched: filtered.len(),
            filtered_out,
            published,
            updated,
            skipped,
            error: Some(msg),
        };
    }

    if deadline_exceeded {
        tracing::info!(source_id, "run deadline reached; remaining items left for next run");
    }

    pipeline_state = apply(pipeline_state, &PipelineEvent::AllItemsProcessed).unwrap_or(pipeline_state);

    let _ = store.source_state.mark_success(source_id, (published + updated) as i32).await;
    let _ = store
        .activity_log
        .append(
            Some(source_id),
            ActivityAction::Fetch,
            serde_json::json!({ "fetched": filtered.len(), "published": published, "updated": updated, "skipped": skipped }),
        )
        .await;

    RunOutcome {
        state_name: state_name(pipeline_state),
        fetched: filtered.len(),
        filtered_out,
        published,
        updated,
        skipped,
        error: None,
    }
}

async fn handle_fetch_error(store: &Store, source_id: &str, err: relay_sources::ProviderError) -> RunOutcome {
    // A malformed-but-received response: logged as a skip, not an error —
    // it neither counts against error_count nor aborts the source. Treated
    // like a zero-item successful check so `last_check`/`last_success`
    // still advance and the source isn't immediately re-picked next pass.
    if err.is_parse_failure() {
        let _ = store.source_state.mark_success(source_id, 0).await;
        let _ = store
            .activity_log
            .append(
                Some(source_id),
                ActivityAction::Skip,
                serde_json::json!({ "reason": "parse_failure", "error": err.to_string() }),
            )
            .await;
        return RunOutcome { state_name: "Done", error: None, ..Default::default() };
    }

    if err.is_transient() {
        let _ = store.source_state.mark_transient_error(source_id, &err.to_string()).await;
        let _ = store
            .activity_log
            .append(Some(source_id), ActivityAction::TransientError, serde_json::json!({ "error": err.to_string() }))
            .await;
        RunOutcome { state_name: "Idle", error: Some(err.to_string()), ..Default::default() }
    } else {
        let _ = store.source_state.mark_error(source_id, &err.to_string()).await;
        let _ = store
            .activity_log
            .append(Some(source_id), ActivityAction::Error, serde_json::json!({ "error": err.to_string() }))
            .await;
        RunOutcome { state_name: "Errored", error: Some(err.to_string()), ..Default::default() }
    }
}

fn render_text(post: &UniformPost) -> String {
    post.text.clone()
}

/// A publish/update attempt's failure, classified for the caller's
/// mark_error vs. mark_transient_error decision per §4.D's error table.
enum ItemFailure {
    /// Rate-limited or transient-network, persistent past the retry
    /// policy — does not count against `error_count`.
    Transient(String),
    /// Validation or unexpected failure — aborts the source.
    Hard(String),
}

fn classify_publish_error(op: &str, err: PublishError) -> ItemFailure {
    let msg = format!("{op} failed: {err}");
    match err {
        PublishError::RateLimited { .. } | PublishError::Transient(_) => ItemFailure::Transient(msg),
        _ => ItemFailure::Hard(msg),
    }
}

/// Best-effort retirement of the buffer row an update decision just
/// superseded. A failure here only delays that row's removal to the
/// retention-horizon sweep, so it is logged and not escalated.
async fn supersede_buffer_entry(store: &Store, source_id: &str, superseded_post_id: &str) {
    if let Err(err) = store.edit_buffer.supersede(source_id, superseded_post_id).await {
        tracing::warn!(source_id, post_id = superseded_post_id, error = %err, "failed to supersede edit-detection buffer row");
    }
}

/// Resolves the thread parent, publishes a fresh downstream status, and
/// records the outcome (published-posts row, edit-detection buffer,
/// thread cache). Shared by the `PublishNew` item action and by the
/// not-found/edit-not-allowed reconciliation fallback from `UpdateExisting`.
async fn publish_new(
    store: &Store,
    publisher: &dyn PublisherAdapter,
    config: &SourceConfig,
    source_id: &str,
    post: &UniformPost,
    thread_cache: &mut ThreadCache,
) -> Result<(), ItemFailure> {
    let in_reply_to = if post.is_thread_post && config.thread_handling.mode == ThreadHandlingMode::Chain {
        match thread_cache.parent_for(&store.published_posts, source_id, &post.author.username).await {
            Ok(parent) => parent,
            Err(err) => {
                tracing::warn!(source_id, error = %err, "thread parent lookup failed; publishing standalone");
                None
            }
        }
    } else {
        None
    };

    // Register the item in the edit-detection buffer before publishing (no
    // downstream id yet) so a concurrent fetch of the same item sees it
    // immediately via the unique constraint rather than racing to publish
    // it twice.
    record_edit_buffer(store, source_id, post, None).await;

    let media_ids = upload_media(publisher, post).await;
    let text = render_text(post);
    let visibility = parse_visibility(&config.visibility);
    let result = with_retry("publish", || {
        publisher.publish(&text, &media_ids, visibility, in_reply_to.as_deref())
    })
    .await;

    match result {
        Ok(published_ref) => {
            store
                .published_posts
                .mark_published(source_id, &post.id, &post.url, Some(&published_ref.id), post.platform_uri.as_deref())
                .await
                .map_err(|err| ItemFailure::Hard(format!("mark_published failed: {err}")))?;
            record_edit_buffer(store, source_id, post, Some(&published_ref.id)).await;
            thread_cache.record(source_id, &post.author.username, published_ref.id.clone());
            let _ = store
                .activity_log
                .append(
                    Some(source_id),
                    ActivityAction::Publish,
                    serde_json::json!({ "post_id": post.id, "downstream_status_id": published_ref.id }),
                )
                .await;
            Ok(())
        }
        Err(err) => Err(classify_publish_error("publish", err)),
    }
}

/// Records the normalized text + hash in the edit-detection buffer after a
/// successful publish or update, so later items from this author can be
/// compared against it within the similarity window.
async fn record_edit_buffer(store: &Store, source_id: &str, post: &UniformPost, downstream_id: Option<&str>) {
    let norm = normalize(&post.text);
    let text_hash = hash(&norm);
    let username_lower = post.author.username.to_lowercase();
    if let Err(err) = store
        .edit_buffer
        .add(source_id, &post.id, &username_lower, &norm, &text_hash, downstream_id)
        .await
    {
        tracing::warn!(source_id, post_id = %post.id, error = %err, "failed to record edit-detection buffer entry");
    }
}

async fn upload_media(publisher: &dyn PublisherAdapter, _post: &UniformPost) -> Vec<String> {
    // Upstream adapters in this workspace never carry raw media bytes (they
    // report URLs only); a concrete source implementation that fetches
    // bytes would populate `MediaItem`s here. Kept as a seam so
    // `relay-publish`'s bounded-parallel uploader is reused unchanged.
    let items: Vec<MediaItem> = Vec::new();
    if items.is_empty() {
        return Vec::new();
    }
    relay_publish::upload_media_bounded(publisher, items).await
}

fn state_name(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Idle => "Idle",
        PipelineState::Fetching => "Fetching",
        PipelineState::Filtering => "Filtering",
        PipelineState::Processing => "Processing",
        PipelineState::Publishing => "Publishing",
        PipelineState::Done => "Done",
        PipelineState::Errored => "Errored",
    }
}
