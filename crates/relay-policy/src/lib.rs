//! Per-source rate and error policy.
//!
//! Goals:
//! - Daily post budget enforcement (with day-rollover reset)
//! - Per-run publish budget
//! - Skip-hours gate
//! - Disabled gate
//! - Consecutive-error surfacing threshold for the external health monitor
//!
//! Deterministic, pure logic. No IO, no wall-clock — callers supply `today`
//! and `local_hour`.

mod engine;
mod types;

pub use engine::{effective_posts_today, evaluate, should_surface_to_monitoring};
pub use types::*;
