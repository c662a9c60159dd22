use chrono::NaiveDate;

/// Per-source policy configuration, sourced from the source's config entry
/// (the configuration surface).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Caps items actually published this run; excess items are left for
    /// the next run.
    pub max_posts_per_run: i64,
    /// `posts_today` + the increment must not exceed this. `None` means no
    /// daily cap is enforced.
    pub daily_post_cap: Option<i64>,
    /// Hours (local time, 0-23) during which fetch is skipped entirely.
    pub skip_hours: Vec<u8>,
    /// Consecutive-error threshold (operator-configured) at which a source
    /// is surfaced to monitoring. The core never auto-disables on this.
    pub critical_error_count: i64,
}

impl PolicyConfig {
    pub fn sane_defaults() -> Self {
        Self {
            max_posts_per_run: 10,
            daily_post_cap: None,
            skip_hours: Vec::new(),
            critical_error_count: 5,
        }
    }
}

/// Point-in-time source state relevant to a policy decision, mirroring the
/// durable `source_state` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyState {
    pub posts_today: i64,
    pub last_reset: NaiveDate,
    pub error_count: i64,
    pub disabled: bool,
}

/// What the pipeline asked permission to do: fetch, or publish one more
/// item within the current run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyRequest {
    Fetch { local_hour: u8 },
    PublishOne { published_so_far_in_run: i64 },
}

/// Outcome of a policy check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyAction {
    Proceed,
    SkipDisabled,
    SkipHour,
    SkipRunBudgetReached,
    SkipDailyCapReached,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyDecision {
    pub action: PolicyAction,
    pub reason: &'static str,
}
