//! Bot API client over reqwest.
//!
//! JSON methods retry on 429 using `parameters.retry_after`. Multipart
//! uploads stream the file from disk and are not retried, since the body can
//! only be consumed once.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::types::{ApiResponse, File, Message, Update};
use super::{CAPTION_LIMIT, MESSAGE_LIMIT, truncate_message};
use crate::services::{
    Messenger, NoProgress, ProgressSink, StatusHandle, Transport, UploadRequest,
};
use crate::utils::http_client;
use crate::{Error, Result};

/// Maximum number of retries for rate-limited requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Slack on top of the long-poll timeout before the request is abandoned.
const POLL_GRACE: Duration = Duration::from_secs(15);

pub struct TelegramClient {
    client: Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client::build_client(CONNECT_TIMEOUT)?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, file_path)
    }

    /// Call a JSON method with rate limit handling.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        payload: &Value,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let url = self.method_url(method);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let mut request = self.client.post(&url).json(payload);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }
            let response = request.send().await?;
            let status = response.status();
            let body: ApiResponse<T> = response.json().await?;

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = body
                    .parameters
                    .as_ref()
                    .and_then(|p| p.retry_after)
                    .map(Duration::from_secs);

                if attempts >= MAX_RATE_LIMIT_RETRIES {
                    warn!(
                        "Telegram rate limit: max retries ({}) exceeded, last retry_after was {:?}",
                        MAX_RATE_LIMIT_RETRIES, retry_after
                    );
                    return Err(Error::transport(
                        method,
                        format!("rate limit exceeded after {} retries", MAX_RATE_LIMIT_RETRIES),
                    ));
                }

                let wait_duration = retry_after.unwrap_or(Duration::from_secs(1));
                debug!(
                    "Telegram rate limited (429), waiting {:?} before retry (attempt {}/{})",
                    wait_duration, attempts, MAX_RATE_LIMIT_RETRIES
                );
                tokio::time::sleep(wait_duration).await;
                continue;
            }

            return into_result(method, status, body);
        }
    }

    /// Long-poll `getUpdates`.
    pub async fn poll_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>> {
        let mut payload = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call("getUpdates", &payload, Some(timeout + POLL_GRACE))
            .await
    }

    /// Resend a stored photo by `file_id`.
    pub async fn send_photo(&self, chat_id: i64, file_id: &str, caption: Option<&str>) -> Result<()> {
        let mut payload = json!({ "chat_id": chat_id, "photo": file_id });
        if let Some(caption) = caption {
            payload["caption"] = json!(truncate_message(caption, CAPTION_LIMIT));
        }
        self.call::<Message>("sendPhoto", &payload, None).await?;
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<File> {
        self.call("getFile", &json!({ "file_id": file_id }), None)
            .await
    }

    /// Resolve `file_id` and stream it into `path`.
    async fn fetch_file(
        &self,
        file_id: &str,
        size_hint: u64,
        path: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        let file = self.get_file(file_id).await?;
        let file_path = file.file_path.ok_or_else(|| {
            Error::transport("getFile", "no file_path returned; the file may be too big")
        })?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await?
            .error_for_status()?;
        let total = response
            .content_length()
            .or(file.file_size)
            .unwrap_or(size_hint);

        let mut out = tokio::fs::File::create(path)
            .await
            .map_err(|e| Error::io_path("creating", path, e))?;
        let mut stream = response.bytes_stream();
        let mut done: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            out.write_all(&chunk)
                .await
                .map_err(|e| Error::io_path("writing", path, e))?;
            done += chunk.len() as u64;
            progress.on_progress(done, total).await;
        }

        out.flush()
            .await
            .map_err(|e| Error::io_path("flushing", path, e))?;
        debug!(path = %path.display(), bytes = done, "Download complete");
        Ok(())
    }

    /// Send a file with a multipart request, reporting bytes as they are read
    /// from disk.
    async fn upload(
        &self,
        method: &'static str,
        field: &'static str,
        request: &UploadRequest<'_>,
        extra: &[(&'static str, String)],
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        let file = tokio::fs::File::open(request.path)
            .await
            .map_err(|e| Error::io_path("opening", request.path, e))?;
        let total = file
            .metadata()
            .await
            .map_err(|e| Error::io_path("reading metadata of", request.path, e))?
            .len();

        let (tx, mut rx) = tokio::sync::watch::channel(0u64);
        let mut sent: u64 = 0;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                let _ = tx.send(sent);
            }
            chunk
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(request.file_name.to_string());
        let mut form = Form::new()
            .text("chat_id", request.chat_id.to_string())
            .text("caption", truncate_message(request.caption, CAPTION_LIMIT))
            .part(field, part);

        if let Some(reply_to) = request.reply_to {
            form = form.text(
                "reply_parameters",
                json!({ "message_id": reply_to, "allow_sending_without_reply": true }).to_string(),
            );
        }
        if let Some(duration) = request.duration {
            form = form.text("duration", duration.to_string());
        }
        for (key, value) in extra {
            form = form.text(*key, value.clone());
        }
        if let Some(thumb) = request.thumbnail {
            let bytes = tokio::fs::read(thumb)
                .await
                .map_err(|e| Error::io_path("reading", thumb, e))?;
            form = form.part(
                "thumbnail",
                Part::bytes(bytes)
                    .file_name("thumb.jpg")
                    .mime_str("image/jpeg")?,
            );
        }

        let send = self.client.post(self.method_url(method)).multipart(form).send();
        tokio::pin!(send);

        let mut watching = true;
        let response = loop {
            tokio::select! {
                result = &mut send => break result?,
                changed = rx.changed(), if watching => match changed {
                    Ok(()) => {
                        let current = *rx.borrow_and_update();
                        progress.on_progress(current, total).await;
                    }
                    Err(_) => watching = false,
                },
            }
        };

        let status = response.status();
        let body: ApiResponse<Value> = response.json().await?;
        into_result(method, status, body).map(|_| ())
    }
}

fn into_result<T>(method: &'static str, status: StatusCode, body: ApiResponse<T>) -> Result<T> {
    if body.ok
        && let Some(result) = body.result
    {
        return Ok(result);
    }

    let description = body
        .description
        .unwrap_or_else(|| "no description".to_string());
    Err(Error::transport(method, format!("{} - {}", status, description)))
}

#[async_trait]
impl Transport for TelegramClient {
    async fn download_to_path(
        &self,
        source: &str,
        size_hint: u64,
        path: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        self.fetch_file(source, size_hint, path, progress).await
    }

    async fn upload_document(
        &self,
        request: &UploadRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        self.upload("sendDocument", "document", request, &[], progress)
            .await
    }

    async fn upload_video(
        &self,
        request: &UploadRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        let extra = [("supports_streaming", "true".to_string())];
        self.upload("sendVideo", "video", request, &extra, progress)
            .await
    }

    async fn upload_audio(
        &self,
        request: &UploadRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        self.upload("sendAudio", "audio", request, &[], progress)
            .await
    }

    async fn download_thumbnail(&self, reference: &str, path: &Path) -> Result<()> {
        self.fetch_file(reference, 0, path, &mut NoProgress).await
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn reply(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<StatusHandle> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": truncate_message(text, MESSAGE_LIMIT),
        });
        if let Some(reply_to) = reply_to {
            payload["reply_parameters"] =
                json!({ "message_id": reply_to, "allow_sending_without_reply": true });
        }

        let message: Message = self.call("sendMessage", &payload, None).await?;
        Ok(StatusHandle {
            chat_id: message.chat.id,
            message_id: message.message_id,
        })
    }

    async fn edit(&self, handle: &StatusHandle, text: &str) -> Result<()> {
        let payload = json!({
            "chat_id": handle.chat_id,
            "message_id": handle.message_id,
            "text": truncate_message(text, MESSAGE_LIMIT),
        });
        match self.call::<Value>("editMessageText", &payload, None).await {
            Ok(_) => Ok(()),
            Err(Error::Transport { message, .. }) if message.contains("message is not modified") => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, handle: &StatusHandle) -> Result<()> {
        let payload = json!({
            "chat_id": handle.chat_id,
            "message_id": handle.message_id,
        });
        self.call::<bool>("deleteMessage", &payload, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = TelegramClient::new("http://localhost:8081/", "123:abc").unwrap();
        assert_eq!(
            client.method_url("getMe"),
            "http://localhost:8081/bot123:abc/getMe"
        );
        assert_eq!(
            client.file_url("videos/file_1.mp4"),
            "http://localhost:8081/file/bot123:abc/videos/file_1.mp4"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = TelegramClient::new("https://api.telegram.org", "secret-token").unwrap();
        assert!(!format!("{client:?}").contains("secret-token"));
    }

    #[test]
    fn test_into_result() {
        let ok: ApiResponse<bool> = serde_json::from_str(r#"{"ok": true, "result": true}"#).unwrap();
        assert!(into_result("deleteMessage", StatusCode::OK, ok).unwrap());

        let err: ApiResponse<bool> = serde_json::from_str(
            r#"{"ok": false, "error_code": 400, "description": "Bad Request: message to delete not found"}"#,
        )
        .unwrap();
        let err = into_result("deleteMessage", StatusCode::BAD_REQUEST, err).unwrap_err();
        assert!(err.to_string().contains("message to delete not found"));
        assert!(err.to_string().starts_with("deleteMessage failed"));
    }
}
