//! Live HTTP implementation of `PublisherAdapter` against a
//! Mastodon-compatible REST API.
//!
//! `POST /api/v1/statuses`, `PUT /api/v1/statuses/:id`,
//! `DELETE /api/v1/statuses/:id`, `POST /api/v2/media`. Bearer-token
//! authenticated; every request carries the operation-level open/read
//! timeouts required by the concurrency model.

use std::time::Duration;

use async_trait::async_trait;
use relay_publish::{PublishError, PublisherAdapter};
use relay_schemas::{PublishedRef, Visibility};
use serde::Deserialize;

const OPEN_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpPublisher {
    base_url: String,
    bearer_token: String,
    http: reqwest::Client,
}

impl HttpPublisher {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(OPEN_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
    ) -> Result<T, PublishError> {
        let status = resp.status();
        if status.is_success() {
            resp.json::<T>()
                .await
                .map_err(|e| PublishError::Validation(format!("decode failed: {e}")))
        } else if status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            Err(PublishError::RateLimited { retry_after_secs })
        } else if status.is_server_error() {
            Err(PublishError::Transient(format!("http {status}")))
        } else if status.as_u16() == 404 {
            Err(PublishError::NotFound)
        } else if status.as_u16() == 422 {
            let body = resp.text().await.unwrap_or_default();
            Err(PublishError::EditNotAllowed.validation_or(body))
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(PublishError::Validation(format!("http {status}: {body}")))
        }
    }
}

// Small helper so a 422 that isn't clearly edit-related still reports as a
// validation error with the body attached, without duplicating match arms.
trait EditNotAllowedExt {
    fn validation_or(self, body: String) -> PublishError;
}
impl EditNotAllowedExt for PublishError {
    fn validation_or(self, body: String) -> PublishError {
        if body.to_ascii_lowercase().contains("edit") {
            PublishError::EditNotAllowed
        } else {
            PublishError::Validation(body)
        }
    }
}

#[derive(Deserialize)]
struct StatusResponse {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct MediaResponse {
    id: String,
}

#[async_trait]
impl PublisherAdapter for HttpPublisher {
    async fn publish(
        &self,
        text: &str,
        media_ids: &[String],
        visibility: Visibility,
        in_reply_to: Option<&str>,
    ) -> Result<PublishedRef, PublishError> {
        let visibility_str = match visibility {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
            Visibility::Direct => "direct",
        };
        let mut body = serde_json::json!({
            "status": text,
            "visibility": visibility_str,
            "media_ids": media_ids,
        });
        if let Some(parent) = in_reply_to {
            body["in_reply_to_id"] = serde_json::Value::String(parent.to_string());
        }

        let resp = self
            .http
            .post(self.url("/api/v1/statuses"))
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(to_transport_error)?;

        let parsed: StatusResponse = Self::handle_response(resp).await?;
        Ok(PublishedRef { id: parsed.id, url: parsed.url })
    }

    async fn update(
        &self,
        status_id: &str,
        text: &str,
        media_ids: Option<&[String]>,
    ) -> Result<PublishedRef, PublishError> {
        let mut body = serde_json::json!({ "status": text });
        if let Some(ids) = media_ids {
            body["media_ids"] = serde_json::json!(ids);
        }

        let resp = self
            .http
            .put(self.url(&format!("/api/v1/statuses/{status_id}")))
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(to_transport_error)?;

        let parsed: StatusResponse = Self::handle_response(resp).await?;
        Ok(PublishedRef { id: parsed.id, url: parsed.url })
    }

    async fn delete(&self, status_id: &str) -> Result<(), PublishError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/v1/statuses/{status_id}")))
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(to_transport_error)?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else if status.as_u16() == 404 {
            Err(PublishError::NotFound)
        } else if status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            Err(PublishError::RateLimited { retry_after_secs })
        } else if status.is_server_error() {
            Err(PublishError::Transient(format!("http {status}")))
        } else {
            Err(PublishError::Validation(format!("http {status}")))
        }
    }

    async fn upload_media(
        &self,
        bytes: Vec<u8>,
        mime: &str,
        filename: &str,
        alt: Option<&str>,
    ) -> Result<String, PublishError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| PublishError::Validation(format!("invalid mime: {e}")))?;
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(alt) = alt {
            form = form.text("description", alt.to_string());
        }

        let resp = self
            .http
            .post(self.url("/api/v2/media"))
            .bearer_auth(&self.bearer_token)
            .multipart(form)
            .send()
            .await
            .map_err(to_transport_error)?;

        let parsed: MediaResponse = Self::handle_response(resp).await?;
        Ok(parsed.id)
    }
}

fn to_transport_error(err: reqwest::Error) -> PublishError {
    PublishError::Transient(err.to_string())
}
