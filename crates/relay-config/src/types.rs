use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scheduling priority tier; determines the default poll interval
/// (`Priority::default_interval_minutes`) unless `interval_minutes` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn default_interval_minutes(&self) -> i64 {
        match self {
            Priority::High => 5,
            Priority::Normal => 20,
            Priority::Low => 55,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilteringConfig {
    #[serde(default)]
    pub skip_replies: bool,
    #[serde(default)]
    pub skip_retweets: bool,
    #[serde(default)]
    pub skip_quotes: bool,
    /// Anything the source's filtering block declares that this version of
    /// the core doesn't recognize; carried opaquely.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadHandlingMode {
    Chain,
    Standalone,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadHandlingConfig {
    #[serde(default = "default_thread_mode")]
    pub mode: ThreadHandlingMode,
}

fn default_thread_mode() -> ThreadHandlingMode {
    ThreadHandlingMode::Chain
}

impl Default for ThreadHandlingMode {
    fn default() -> Self {
        ThreadHandlingMode::Chain
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub account_id: String,
    /// Downstream instance base URL (e.g. `https://relay.example.social`),
    /// passed straight to `relay_publish_http::HttpPublisher`. Absent for
    /// sources only ever run with a mock/dry-run publisher.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the environment variable carrying the downstream bearer token
    /// for this source's target account. Resolved by `relay_config::secrets`.
    #[serde(default)]
    pub token_env: Option<String>,
}

/// One entry of the configuration surface. Unrecognized
/// top-level keys are carried in `extra` rather than rejected — the core
/// treats them as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub platform: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub feed_url: Option<String>,
    pub target: TargetConfig,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub interval_minutes: Option<i64>,
    #[serde(default = "default_max_posts")]
    pub max_posts_per_run: i64,
    #[serde(default)]
    pub skip_hours: Vec<u8>,
    #[serde(default)]
    pub filtering: FilteringConfig,
    #[serde(default)]
    pub thread_handling: ThreadHandlingConfig,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default)]
    pub daily_post_cap: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn default_true() -> bool {
    true
}

fn default_max_posts() -> i64 {
    10
}

fn default_visibility() -> String {
    "public".to_string()
}

impl SourceConfig {
    /// The effective polling interval: the explicit override, or the
    /// priority tier's default, or `normal`'s default if priority is absent.
    pub fn effective_interval_minutes(&self) -> i64 {
        self.interval_minutes.unwrap_or_else(|| {
            self.priority
                .unwrap_or(Priority::Normal)
                .default_interval_minutes()
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "default_global_min_interval")]
    pub min_interval_minutes: i64,
    #[serde(default = "default_global_limit")]
    pub limit: i64,
    #[serde(default = "default_platform_concurrency")]
    pub per_platform_concurrency: i64,
    #[serde(default = "default_run_deadline")]
    pub run_deadline_secs: i64,
    #[serde(default = "default_critical_error_count")]
    pub critical_error_count: i64,
    #[serde(default = "default_buffer_retention_hours")]
    pub edit_buffer_retention_hours: i64,
}

fn default_global_min_interval() -> i64 {
    5
}
fn default_global_limit() -> i64 {
    100
}
fn default_platform_concurrency() -> i64 {
    4
}
fn default_run_deadline() -> i64 {
    300
}
fn default_critical_error_count() -> i64 {
    5
}
fn default_buffer_retention_hours() -> i64 {
    2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}
