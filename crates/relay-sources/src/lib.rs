//! Upstream adapter interface.
//!
//! This crate owns the adapter abstraction that turns a heterogeneous
//! upstream feed into `relay_schemas::UniformPost` values. It does **not**
//! talk to the database or to the downstream publisher; callers (the
//! pipeline) fetch items and hand them off.
//!
//! Concrete platform scraping/API clients are out of scope here — this
//! crate ships the trait, the error vocabulary, and a fixture-backed
//! adapter used by tests and dry runs.

pub mod fixture;

use async_trait::async_trait;
use relay_schemas::UniformPost;
use std::fmt;

/// Pluggable upstream source interface. One implementation per platform
/// (e.g. RSS, a specific social API) lives outside this crate and is wired
/// up by the orchestrator via source config.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Stable identifier matching the source's config entry, used in logs
    /// and in the `source_id` column of durable state.
    fn source_id(&self) -> &str;

    /// Fetch whatever is newly available. Adapters are expected to be
    /// idempotent-safe: returning an item already seen is fine, dedup is
    /// the caller's job.
    async fn fetch(&self) -> Result<Vec<UniformPost>, ProviderError>;
}

/// Error vocabulary an adapter reports back to the pipeline, which in turn
/// classifies these into `source_state.last_error`/retry policy.
#[derive(Debug)]
pub enum ProviderError {
    /// Network/transport-level failure: connection refused, timeout, DNS.
    Transport(String),
    /// The upstream API responded but signaled an error (rate limit,
    /// auth failure, 5xx, malformed-but-parseable error body).
    Api { code: Option<u16>, message: String },
    /// The response body could not be decoded into the expected shape.
    Decode(String),
    /// The adapter itself is misconfigured (missing credential, bad URL).
    Config(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {}", msg),
            ProviderError::Api { code: Some(c), message } => {
                write!(f, "api error (code={}): {}", c, message)
            }
            ProviderError::Api { code: None, message } => write!(f, "api error: {}", message),
            ProviderError::Decode(msg) => write!(f, "decode error: {}", msg),
            ProviderError::Config(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Whether the pipeline should treat this as transient (retry-worthy
    /// on the next scheduled run) rather than a hard error to surface.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Api { code: Some(c), .. } => *c == 429 || (500..600).contains(c),
            ProviderError::Api { code: None, .. } => true,
            ProviderError::Decode(_) => false,
            ProviderError::Config(_) => false,
        }
    }

    /// A malformed upstream payload: the adapter got a response, it just
    /// couldn't be parsed into the expected shape. Logged as a skip and
    /// never counts against the consecutive-error budget — distinct from
    /// both `is_transient` (nothing to retry; the bytes it got were the
    /// bytes it's going to get) and `Config`/unexpected failures (which do
    /// abort the source).
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, ProviderError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient() {
        assert!(ProviderError::Transport("connection reset".into()).is_transient());
    }

    #[test]
    fn rate_limit_and_5xx_are_transient() {
        assert!(ProviderError::Api { code: Some(429), message: "slow down".into() }.is_transient());
        assert!(ProviderError::Api { code: Some(503), message: "unavailable".into() }.is_transient());
    }

    #[test]
    fn auth_failure_is_not_transient() {
        assert!(!ProviderError::Api { code: Some(401), message: "bad token".into() }.is_transient());
    }

    #[test]
    fn decode_and_config_errors_are_not_transient() {
        assert!(!ProviderError::Decode("unexpected shape".into()).is_transient());
        assert!(!ProviderError::Config("missing api key".into()).is_transient());
    }

    #[test]
    fn only_decode_errors_are_parse_failures() {
        assert!(ProviderError::Decode("unexpected shape".into()).is_parse_failure());
        assert!(!ProviderError::Config("missing api key".into()).is_parse_failure());
        assert!(!ProviderError::Transport("connection reset".into()).is_parse_failure());
        assert!(!ProviderError::Api { code: Some(500), message: "oops".into() }.is_parse_failure());
    }

    #[test]
    fn display_formats_are_human_readable() {
        let e = ProviderError::Api { code: Some(429), message: "rate limited".into() };
        assert_eq!(e.to_string(), "api error (code=429): rate limited");
    }
}
