//! Media content-type detection and bounded-parallel upload, per §4.F.
//!
//! Primary detection is magic-byte sniffing; extension is the fallback.
//! When sniffing disagrees with the caller-supplied extension, the filename
//! is rewritten to agree with the sniffed type. An unrecognized payload is
//! abandoned rather than force-uploaded.

use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::adapter::{PublishError, PublisherAdapter};

const MAX_CONCURRENT_UPLOADS: usize = 4;

/// One media item pending upload.
pub struct MediaItem {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub alt: Option<String>,
}

/// Sniff magic bytes; returns the matching MIME type, or `None` if
/// unrecognized.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return Some("video/mp4");
    }
    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some("video/webm");
    }
    None
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        _ => "bin",
    }
}

fn mime_from_extension(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => return None,
    })
}

/// Resolves the MIME type to upload with and a filename guaranteed to carry
/// the matching extension. Returns `None` if neither sniffing nor the
/// extension identify a supported type — the caller abandons the upload.
pub fn resolve_media_type(bytes: &[u8], filename: &str) -> Option<(&'static str, String)> {
    let mime = sniff_mime(bytes).or_else(|| mime_from_extension(filename))?;

    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);
    let corrected = format!("{stem}.{}", extension_for(mime));
    Some((mime, corrected))
}

/// Uploads up to `MAX_CONCURRENT_UPLOADS` items concurrently. Per-item
/// failures (including unrecognized media type) are logged and excluded
/// from the result; the returned order matches the input order with
/// failures removed.
pub async fn upload_media_bounded(
    adapter: &dyn PublisherAdapter,
    items: Vec<MediaItem>,
) -> Vec<String> {
    let mut results: Vec<Option<String>> = vec![None; items.len()];
    let mut pending = FuturesUnordered::new();
    let mut next = 0usize;

    let mut push_next = |idx: usize, pending: &mut FuturesUnordered<_>| {
        if idx >= items.len() {
            return;
        }
        let item = &items[idx];
        let bytes = item.bytes.clone();
        let filename = item.filename.clone();
        let alt = item.alt.clone();
        pending.push(async move {
            let resolved = resolve_media_type(&bytes, &filename);
            let (mime, filename) = match resolved {
                Some(pair) => pair,
                None => {
                    tracing::warn!(filename, "media type unrecognized, abandoning upload");
                    return (idx, Err(PublishError::Validation("unrecognized media type".into())));
                }
            };
            let result = adapter.upload_media(bytes, mime, &filename, alt.as_deref()).await;
            (idx, result)
        });
    };

    while next < items.len() && next < MAX_CONCURRENT_UPLOADS {
        push_next(next, &mut pending);
        next += 1;
    }

    while let Some((idx, result)) = pending.next().await {
        match result {
            Ok(id) => results[idx] = Some(id),
            Err(err) => tracing::warn!(idx, error = %err, "media upload failed, excluding from result"),
        }
        if next < items.len() {
            push_next(next, &mut pending);
            next += 1;
        }
    }

    results.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_schemas::{PublishedRef, Visibility};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn sniffs_jpeg_png_gif_webp() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0x00]), Some("image/jpeg"));
        assert_eq!(
            sniff_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("image/png")
        );
        assert_eq!(sniff_mime(b"GIF89a..."), Some("image/gif"));
        let mut webp = b"RIFF".to_vec();
        webp.extend_from_slice(&[0, 0, 0, 0]);
        webp.extend_from_slice(b"WEBP");
        assert_eq!(sniff_mime(&webp), Some("image/webp"));
    }

    #[test]
    fn unknown_bytes_sniff_to_none() {
        assert_eq!(sniff_mime(b"not a media file"), None);
    }

    #[test]
    fn sniffed_type_disagreeing_with_extension_rewrites_filename() {
        let jpeg_bytes = [0xFFu8, 0xD8, 0xFF, 0x00];
        let (mime, filename) = resolve_media_type(&jpeg_bytes, "photo.png").unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(filename, "photo.jpg");
    }

    #[test]
    fn falls_back_to_extension_when_sniff_is_inconclusive() {
        let (mime, filename) = resolve_media_type(b"not sniffable", "clip.mp4").unwrap();
        assert_eq!(mime, "video/mp4");
        assert_eq!(filename, "clip.mp4");
    }

    #[test]
    fn unrecognized_type_resolves_to_none() {
        assert!(resolve_media_type(b"not sniffable", "file.xyz").is_none());
    }

    struct CountingAdapter {
        max_seen_concurrent: Mutex<usize>,
        current: AtomicUsize,
    }

    impl CountingAdapter {
        fn new() -> Self {
            Self { max_seen_concurrent: Mutex::new(0), current: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl PublisherAdapter for CountingAdapter {
        async fn publish(
            &self,
            _text: &str,
            _media_ids: &[String],
            _visibility: Visibility,
            _in_reply_to: Option<&str>,
        ) -> Result<PublishedRef, PublishError> {
            unimplemented!()
        }
        async fn update(
            &self,
            _status_id: &str,
            _text: &str,
            _media_ids: Option<&[String]>,
        ) -> Result<PublishedRef, PublishError> {
            unimplemented!()
        }
        async fn delete(&self, _status_id: &str) -> Result<(), PublishError> {
            unimplemented!()
        }
        async fn upload_media(
            &self,
            _bytes: Vec<u8>,
            _mime: &str,
            filename: &str,
            _alt: Option<&str>,
        ) -> Result<String, PublishError> {
            let n = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            {
                let mut max = self.max_seen_concurrent.lock().unwrap();
                if n > *max {
                    *max = n;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("media-{filename}"))
        }
    }

    fn jpeg_item(name: &str) -> MediaItem {
        MediaItem { bytes: vec![0xFF, 0xD8, 0xFF, 0x00], filename: name.to_string(), alt: None }
    }

    #[tokio::test]
    async fn upload_respects_concurrency_cap_and_preserves_order() {
        let adapter = CountingAdapter::new();
        let items = vec![jpeg_item("a.jpg"), jpeg_item("b.jpg"), jpeg_item("c.jpg"), jpeg_item("d.jpg"), jpeg_item("e.jpg")];
        let results = upload_media_bounded(&adapter, items).await;
        assert_eq!(results.len(), 5);
        assert_eq!(results[0], "media-a.jpg");
        assert_eq!(results[4], "media-e.jpg");
        assert!(*adapter.max_seen_concurrent.lock().unwrap() <= MAX_CONCURRENT_UPLOADS);
    }

    #[tokio::test]
    async fn unrecognized_item_is_excluded_but_others_succeed() {
        let adapter = CountingAdapter::new();
        let items = vec![
            jpeg_item("a.jpg"),
            MediaItem { bytes: b"garbage".to_vec(), filename: "b.xyz".to_string(), alt: None },
            jpeg_item("c.jpg"),
        ];
        let results = upload_media_bounded(&adapter, items).await;
        assert_eq!(results, vec!["media-a.jpg".to_string(), "media-c.jpg".to_string()]);
    }
}
