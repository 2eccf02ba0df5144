//! Telegram Bot API adapter: long-poll getUpdates, file download, and
//! outbound sendMessage/sendPhoto via the HTTP API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::{FetchError, SendError};
use crate::extract::{ImageRef, InboundMessage};
use crate::pipeline::{ImageFetcher, Sender};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// getUpdates result item.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub forward_origin: Option<ForwardOrigin>,
    #[serde(default)]
    pub forward_from_chat: Option<Chat>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Origin of a forwarded message (Bot API 7+); older servers still send
/// `forward_from_chat` instead.
#[derive(Debug, Deserialize)]
pub struct ForwardOrigin {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub chat: Option<Chat>,
}

#[derive(Debug, Default, Deserialize)]
struct FileInfo {
    #[serde(default)]
    file_path: Option<String>,
}

/// Map one update to the pipeline's message snapshot. Updates without a
/// message payload (edits, channel posts, etc.) are skipped.
pub fn inbound_from_update(update: Update, unknown_channel_name: &str) -> Option<InboundMessage> {
    let message = update.message?;
    let is_forwarded = message.forward_origin.is_some() || message.forward_from_chat.is_some();
    let source_channel = message
        .forward_origin
        .as_ref()
        .and_then(|origin| origin.chat.as_ref())
        .or(message.forward_from_chat.as_ref())
        .and_then(|chat| chat.title.clone())
        .unwrap_or_else(|| unknown_channel_name.to_string());
    let image = message
        .photo
        .as_deref()
        .and_then(largest_photo)
        .map(|photo| ImageRef(photo.file_id.clone()));

    Some(InboundMessage {
        chat_id: message.chat.id,
        is_forwarded,
        source_channel,
        text: message.text,
        caption: message.caption,
        image,
    })
}

fn largest_photo(photos: &[PhotoSize]) -> Option<&PhotoSize> {
    photos
        .iter()
        .max_by_key(|photo| u64::from(photo.width) * u64::from(photo.height))
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: api_base(),
            client: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Call getUpdates (long poll). Returns (updates, next offset).
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<(Vec<Update>, Option<i64>)> {
        let mut request = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("timeout", LONG_POLL_TIMEOUT)]);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("getUpdates failed: {} {}", status, body));
        }
        let envelope: ApiEnvelope<Vec<Update>> = response.json().await?;
        if !envelope.ok {
            return Err(anyhow!(
                "getUpdates rejected: {}",
                envelope.description.unwrap_or_else(|| "unknown error".to_string())
            ));
        }
        let updates = envelope.result.unwrap_or_default();
        let next_offset = updates.iter().map(|u| u.update_id).max().map(|id| id + 1);
        Ok((updates, next_offset))
    }

    async fn post_json(&self, method: &str, body: serde_json::Value) -> Result<(), SendError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Status { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl ImageFetcher for TelegramClient {
    /// Resolve the file path via getFile, then download the bytes.
    async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(self.method_url("getFile"))
            .query(&[("file_id", image.0.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }
        let envelope: ApiEnvelope<FileInfo> = response.json().await?;
        let file_path = if envelope.ok {
            envelope.result.and_then(|info| info.file_path)
        } else {
            None
        }
        .ok_or(FetchError::MissingFilePath)?;

        let url = format!("{}/file/bot{}/{}", self.base_url, self.token, file_path);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Sender for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        self.post_json("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await
    }

    /// Re-sends an already-uploaded photo by file id; no bytes travel
    /// through this process.
    async fn send_image_with_caption(
        &self,
        chat_id: i64,
        image: &ImageRef,
        caption: &str,
    ) -> Result<(), SendError> {
        self.post_json(
            "sendPhoto",
            json!({ "chat_id": chat_id, "photo": image.0, "caption": caption }),
        )
        .await
    }
}

/// Bot API base URL, overridable for tests or a local bot server.
fn api_base() -> String {
    std::env::var("TELEGRAM_API_BASE").unwrap_or_else(|_| TELEGRAM_API_BASE.to_string())
}
