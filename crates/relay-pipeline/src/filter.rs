//! Filtering stage: simple predicate rejection applied between FETCHING and
//! PROCESSING. Rejected items are logged as `skip` with reason `filtered`
//! and never reach edit-detection/threading — they do not consume
//! `max_posts_per_run` or the daily budget.

use relay_config::FilteringConfig;
use relay_schemas::UniformPost;

/// Returns `true` if `post` should be rejected by the source's filtering
/// configuration.
pub fn is_filtered_out(cfg: &FilteringConfig, post: &UniformPost) -> bool {
    (cfg.skip_replies && post.is_reply)
        || (cfg.skip_retweets && post.is_repost)
        || (cfg.skip_quotes && post.is_quote)
}
