use async_trait::async_trait;
use relay_schemas::{PublishedRef, Visibility};

/// The downstream publisher interface: four operations, implemented once for
/// real HTTP (`relay-publish-http`) and once deterministically for tests
/// (`relay-publish-mock`). Safe for concurrent calls — adapters hold nothing
/// but credentials and a connection pool.
#[async_trait]
pub trait PublisherAdapter: Send + Sync {
    async fn publish(
        &self,
        text: &str,
        media_ids: &[String],
        visibility: Visibility,
        in_reply_to: Option<&str>,
    ) -> Result<PublishedRef, PublishError>;

    async fn update(
        &self,
        status_id: &str,
        text: &str,
        media_ids: Option<&[String]>,
    ) -> Result<PublishedRef, PublishError>;

    async fn delete(&self, status_id: &str) -> Result<(), PublishError>;

    async fn upload_media(
        &self,
        bytes: Vec<u8>,
        mime: &str,
        filename: &str,
        alt: Option<&str>,
    ) -> Result<String, PublishError>;
}

/// Typed publisher error surface, per the downstream interface's
/// classification (rate-limited / transient / permanent).
#[derive(Debug, Clone)]
pub enum PublishError {
    /// HTTP 429. `retry_after_secs` is the parsed `Retry-After` header, when
    /// present.
    RateLimited { retry_after_secs: Option<u64> },
    /// 5xx or a transport-level timeout.
    Transient(String),
    /// The target status/account does not exist (404-class).
    NotFound,
    /// The downstream rejected an edit to a status it does not allow
    /// editing (e.g. too old, or edits disabled for the account).
    EditNotAllowed,
    /// Any other 4xx: malformed request, unsupported media, etc.
    Validation(String),
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::RateLimited { retry_after_secs } => {
                write!(f, "rate limited (retry_after={:?})", retry_after_secs)
            }
            PublishError::Transient(msg) => write!(f, "transient error: {}", msg),
            PublishError::NotFound => write!(f, "not found"),
            PublishError::EditNotAllowed => write!(f, "edit not allowed"),
            PublishError::Validation(msg) => write!(f, "validation error: {}", msg),
        }
    }
}

impl std::error::Error for PublishError {}
