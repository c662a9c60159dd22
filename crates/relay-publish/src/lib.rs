//! Downstream publisher adapter — component F.
//!
//! Defines the `PublisherAdapter` trait every downstream implementation
//! (real HTTP, deterministic mock) satisfies, plus the shared retry policy
//! and media-handling logic that wraps any adapter.

mod adapter;
mod media;
mod retry;

pub use adapter::{PublishError, PublisherAdapter};
pub use media::{resolve_media_type, sniff_mime, upload_media_bounded, MediaItem};
pub use retry::with_retry;
