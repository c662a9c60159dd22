//! Threading resolver — component C.
//!
//! Maps an upstream self-reply chain onto a downstream reply-to id so a
//! chain of author-replies on the source platform becomes a chain of
//! reply-statuses downstream.
//!
//! # Problem
//!
//! A thread-continuation item only carries its *upstream* parent context
//! (the author it replies to); the downstream service needs the
//! *downstream* status id of the immediately preceding post in that
//! author's chain.
//!
//! # Solution
//!
//! [`ThreadCache`] is the lightweight in-memory store that maps:
//!
//! ```text
//! source_id -> author_handle (lowercased) -> downstream_status_id
//! ```
//!
//! Callers must:
//! 1. Call [`ThreadCache::parent_for`] before publishing any thread-post to
//!    obtain the downstream parent id — a cache miss falls back to the
//!    state store's `find_recent_thread_parent`, and a miss there means
//!    the item publishes as a fresh, standalone status.
//! 2. Call [`ThreadCache::record`] after *every* successful publish
//!    (thread-post or not), so the next item from the same author in the
//!    same run chains from this one.
//!
//! # Lifetime
//!
//! The cache is bound to one orchestrator run, not to the process (design
//! note): construct a fresh [`ThreadCache`] per run and let it
//! drop at the end, so tests stay deterministic and stale entries never
//! leak across runs.
//!
//! # Thread-safety
//! `ThreadCache` is not `Sync`. Each source pipeline instance owns its own
//! cache for the duration of a run — it is never shared between sources.

use std::collections::HashMap;

use relay_db::PublishedPostsRepo;

#[derive(Clone, Debug, Default)]
pub struct ThreadCache {
    // source_id -> (author_handle lowercased -> downstream_status_id)
    cache: HashMap<String, HashMap<String, String>>,
}

impl ThreadCache {
    /// Create an empty cache. Construct one per orchestrator run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the downstream parent id for a thread-continuation item by
    /// `author` on `source_id`.
    ///
    /// Checks the in-memory cache first; on a miss, falls back to the state
    /// store's `find_recent_thread_parent` (most recent published row for
    /// the source within the last 24h with a non-null downstream id). If
    /// both miss, returns `Ok(None)` and the caller publishes a fresh,
    /// standalone status.
    pub async fn parent_for(
        &self,
        published_posts: &PublishedPostsRepo,
        source_id: &str,
        author: &str,
    ) -> anyhow::Result<Option<String>> {
        let author = author.to_lowercase();
        if let Some(id) = self
            .cache
            .get(source_id)
            .and_then(|by_author| by_author.get(&author))
        {
            return Ok(Some(id.clone()));
        }

        published_posts.find_recent_thread_parent(source_id).await
    }

    /// Record the downstream id of a successful publish so subsequent
    /// items from the same author in this run chain from it. Call this
    /// after every publish — thread-post or not — per the ordering
    /// requirement.
    pub fn record(&mut self, source_id: &str, author: &str, downstream_status_id: impl Into<String>) {
        self.cache
            .entry(source_id.to_string())
            .or_default()
            .insert(author.to_lowercase(), downstream_status_id.into());
    }

    /// Number of sources with at least one cached author entry.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// `true` if no source has any cached entries.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_lookup_is_case_insensitive_on_author() {
        let mut cache = ThreadCache::new();
        cache.record("s1", "Alice", "d200");
        assert_eq!(
            cache.cache.get("s1").and_then(|m| m.get("alice")),
            Some(&"d200".to_string())
        );
    }

    #[test]
    fn distinct_sources_do_not_share_entries() {
        let mut cache = ThreadCache::new();
        cache.record("s1", "alice", "d1");
        cache.record("s2", "alice", "d2");
        assert_eq!(cache.cache["s1"]["alice"], "d1");
        assert_eq!(cache.cache["s2"]["alice"], "d2");
    }

    #[test]
    fn later_record_overwrites_earlier_for_same_author() {
        let mut cache = ThreadCache::new();
        cache.record("s1", "alice", "d1");
        cache.record("s1", "alice", "d2");
        assert_eq!(cache.cache["s1"]["alice"], "d2");
    }

    #[test]
    fn fresh_cache_is_empty() {
        let cache = ThreadCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }
}
