//! Deterministic in-memory publisher adapter for tests and `--dry-run`.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - `status_id` is a sequential counter, stringified (`"1"`, `"2"`, ...).
//! - `media_id` is derived from the upload's filename (`"media:{filename}"`),
//!   stable across calls with the same filename.
//! - No randomness, no wall-clock. `BTreeMap`-backed state for stable
//!   iteration when inspecting published statuses in tests.
//! - `publish`/`update`/`delete` never fail on their own; failure injection
//!   is available via `fail_next` for exercising the retry policy in tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use relay_publish::{PublishError, PublisherAdapter};
use relay_schemas::{PublishedRef, Visibility};

#[derive(Clone, Debug)]
pub struct PublishedStatus {
    pub text: String,
    pub media_ids: Vec<String>,
    pub visibility: Visibility,
    pub in_reply_to: Option<String>,
    pub deleted: bool,
}

#[derive(Default)]
struct Inner {
    statuses: BTreeMap<String, PublishedStatus>,
    next_id: u64,
    failures: std::collections::VecDeque<PublishError>,
}

/// Deterministic in-memory stand-in for a downstream ActivityPub-compatible
/// service. Stateless other than this map — safe for concurrent calls.
#[derive(Default)]
pub struct MockPublisher {
    inner: Mutex<Inner>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error to be returned by the next adapter call (consumed
    /// FIFO), for exercising the retry policy deterministically.
    pub fn queue_failure(&self, err: PublishError) {
        self.inner.lock().unwrap().failures.push_back(err);
    }

    pub fn get(&self, status_id: &str) -> Option<PublishedStatus> {
        self.inner.lock().unwrap().statuses.get(status_id).cloned()
    }

    pub fn published_count(&self) -> usize {
        self.inner.lock().unwrap().statuses.values().filter(|s| !s.deleted).count()
    }

    fn next_status_id(inner: &mut Inner) -> String {
        inner.next_id += 1;
        inner.next_id.to_string()
    }

    fn take_queued_failure(&self) -> Option<PublishError> {
        self.inner.lock().unwrap().failures.pop_front()
    }
}

#[async_trait]
impl PublisherAdapter for MockPublisher {
    async fn publish(
        &self,
        text: &str,
        media_ids: &[String],
        visibility: Visibility,
        in_reply_to: Option<&str>,
    ) -> Result<PublishedRef, PublishError> {
        if let Some(err) = self.take_queued_failure() {
            return Err(err);
        }
        let mut inner = self.inner.lock().unwrap();
        let id = Self::next_status_id(&mut inner);
        let url = format!("https://mock.relay.test/statuses/{id}");
        inner.statuses.insert(
            id.clone(),
            PublishedStatus {
                text: text.to_string(),
                media_ids: media_ids.to_vec(),
                visibility,
                in_reply_to: in_reply_to.map(String::from),
                deleted: false,
            },
        );
        Ok(PublishedRef { id, url })
    }

    async fn update(
        &self,
        status_id: &str,
        text: &str,
        media_ids: Option<&[String]>,
    ) -> Result<PublishedRef, PublishError> {
        if let Some(err) = self.take_queued_failure() {
            return Err(err);
        }
        let mut inner = self.inner.lock().unwrap();
        let status = inner
            .statuses
            .get_mut(status_id)
            .ok_or(PublishError::NotFound)?;
        if status.deleted {
            return Err(PublishError::EditNotAllowed);
        }
        status.text = text.to_string();
        if let Some(ids) = media_ids {
            status.media_ids = ids.to_vec();
        }
        let url = format!("https://mock.relay.test/statuses/{status_id}");
        Ok(PublishedRef { id: status_id.to_string(), url })
    }

    async fn delete(&self, status_id: &str) -> Result<(), PublishError> {
        if let Some(err) = self.take_queued_failure() {
            return Err(err);
        }
        let mut inner = self.inner.lock().unwrap();
        let status = inner
            .statuses
            .get_mut(status_id)
            .ok_or(PublishError::NotFound)?;
        status.deleted = true;
        Ok(())
    }

    async fn upload_media(
        &self,
        _bytes: Vec<u8>,
        _mime: &str,
        filename: &str,
        _alt: Option<&str>,
    ) -> Result<String, PublishError> {
        if let Some(err) = self.take_queued_failure() {
            return Err(err);
        }
        Ok(format!("media:{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_then_fetch_round_trips() {
        let p = MockPublisher::new();
        let r = p.publish("hello", &[], Visibility::Public, None).await.unwrap();
        let got = p.get(&r.id).unwrap();
        assert_eq!(got.text, "hello");
        assert!(!got.deleted);
    }

    #[tokio::test]
    async fn sequential_ids_are_deterministic() {
        let p = MockPublisher::new();
        let a = p.publish("a", &[], Visibility::Public, None).await.unwrap();
        let b = p.publish("b", &[], Visibility::Public, None).await.unwrap();
        assert_eq!(a.id, "1");
        assert_eq!(b.id, "2");
    }

    #[tokio::test]
    async fn update_unknown_status_is_not_found() {
        let p = MockPublisher::new();
        let err = p.update("missing", "x", None).await.unwrap_err();
        assert!(matches!(err, PublishError::NotFound));
    }

    #[tokio::test]
    async fn update_after_delete_is_edit_not_allowed() {
        let p = MockPublisher::new();
        let r = p.publish("hello", &[], Visibility::Public, None).await.unwrap();
        p.delete(&r.id).await.unwrap();
        let err = p.update(&r.id, "x", None).await.unwrap_err();
        assert!(matches!(err, PublishError::EditNotAllowed));
    }

    #[tokio::test]
    async fn queued_failure_is_returned_once() {
        let p = MockPublisher::new();
        p.queue_failure(PublishError::RateLimited { retry_after_secs: Some(5) });
        let err = p.publish("a", &[], Visibility::Public, None).await.unwrap_err();
        assert!(matches!(err, PublishError::RateLimited { .. }));
        let ok = p.publish("b", &[], Visibility::Public, None).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn media_id_is_derived_from_filename() {
        let p = MockPublisher::new();
        let id = p.upload_media(vec![1, 2, 3], "image/jpeg", "cat.jpg", None).await.unwrap();
        assert_eq!(id, "media:cat.jpg");
    }
}
