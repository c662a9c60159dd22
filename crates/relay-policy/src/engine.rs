use chrono::NaiveDate;

use crate::{PolicyAction, PolicyConfig, PolicyDecision, PolicyRequest, PolicyState};

/// Deterministic day-rollover maintenance: `posts_today` is logically reset
/// whenever `last_reset < today`. This function does not mutate
/// `state.posts_today` itself — the durable upsert in `relay-db` owns that
/// — it only tells the caller what the *effective* count is for a decision
/// made "as of `today`".
pub fn effective_posts_today(state: &PolicyState, today: NaiveDate) -> i64 {
    if state.last_reset < today {
        0
    } else {
        state.posts_today
    }
}

/// Main evaluator: pure `(cfg, state, request) -> decision` shape, no IO, no
/// wall-clock (the caller supplies `today` and `local_hour`).
pub fn evaluate(
    cfg: &PolicyConfig,
    state: &PolicyState,
    today: NaiveDate,
    request: &PolicyRequest,
) -> PolicyDecision {
    // 1) Disabled gate always wins — an external operator's `disabled_at`
    //    is read as a hard gate.
    if state.disabled {
        return PolicyDecision {
            action: PolicyAction::SkipDisabled,
            reason: "source disabled_at is set",
        };
    }

    match request {
        PolicyRequest::Fetch { local_hour } => {
            if cfg.skip_hours.contains(local_hour) {
                return PolicyDecision {
                    action: PolicyAction::SkipHour,
                    reason: "current local hour is in skip_hours",
                };
            }
            PolicyDecision {
                action: PolicyAction::Proceed,
                reason: "fetch allowed",
            }
        }

        PolicyRequest::PublishOne {
            published_so_far_in_run,
        } => {
            if *published_so_far_in_run >= cfg.max_posts_per_run {
                return PolicyDecision {
                    action: PolicyAction::SkipRunBudgetReached,
                    reason: "max_posts_per_run reached; excess items left for next run",
                };
            }

            if let Some(cap) = cfg.daily_post_cap {
                let effective_today = effective_posts_today(state, today);
                if effective_today + published_so_far_in_run + 1 > cap {
                    return PolicyDecision {
                        action: PolicyAction::SkipDailyCapReached,
                        reason: "daily_post_cap reached; fetch still recorded",
                    };
                }
            }

            PolicyDecision {
                action: PolicyAction::Proceed,
                reason: "publish allowed",
            }
        }
    }
}

/// Whether a source's consecutive-error count has crossed the operator's
/// critical threshold and should be surfaced to monitoring. The core never
/// auto-disables on this — it is read-only signal for the external health
/// monitor.
pub fn should_surface_to_monitoring(cfg: &PolicyConfig, state: &PolicyState) -> bool {
    state.error_count >= cfg.critical_error_count
}
