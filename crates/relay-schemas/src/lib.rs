//! Domain value types shared across the relay crates.
//!
//! Everything here is a plain, serializable value — no behavior, no IO.
//! `UniformPost` is the boundary type produced by upstream adapters (out of
//! scope in this workspace; see `relay-sources`) and consumed by the
//! pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item as reported by an upstream adapter, already normalized into the
/// shape every downstream component agrees on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformPost {
    pub id: String,
    pub url: String,
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub author: Author,
    pub media: Vec<MediaAttachment>,
    pub is_repost: bool,
    pub is_quote: bool,
    pub is_reply: bool,
    pub is_thread_post: bool,
    pub reply_to_handle: Option<String>,
    pub platform_uri: Option<String>,
    pub has_video: bool,
    pub quoted_post: Option<Box<UniformPost>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    pub alt: Option<String>,
}

/// Downstream publish visibility, mirroring the ActivityPub-compatible
/// service's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
    Direct,
}

/// The `{id, url}` pair every successful publish/update returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedRef {
    pub id: String,
    pub url: String,
}

/// An activity-log action kind. Kept as a closed enum because the schema's
/// `CHECK` constraint enumerates exactly these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Fetch,
    Publish,
    Skip,
    Error,
    ProfileSync,
    MediaUpload,
    TransientError,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Fetch => "fetch",
            ActivityAction::Publish => "publish",
            ActivityAction::Skip => "skip",
            ActivityAction::Error => "error",
            ActivityAction::ProfileSync => "profile_sync",
            ActivityAction::MediaUpload => "media_upload",
            ActivityAction::TransientError => "transient_error",
        }
    }
}
