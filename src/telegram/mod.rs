//! Minimal Telegram Bot API client: long polling, replies, file downloads.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::Config;

const DEFAULT_TELEGRAM_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    #[serde(default)]
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

pub struct TelegramClient {
    client: Client,
    base: String,
    token: String,
    poll_timeout: u64,
}

impl TelegramClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let token = cfg
            .bot_token()
            .ok_or_else(|| anyhow!("Missing TELEGRAM_BOT_TOKEN. Set it in env, .env or ~/.config/pipbot/.pipbotrc"))?;

        let base = cfg
            .get("TELEGRAM_API_BASE")
            .unwrap_or_else(|| DEFAULT_TELEGRAM_BASE.to_string());

        let poll_timeout = cfg.get_u64("POLL_TIMEOUT").unwrap_or(30);
        // The HTTP deadline must outlast a long poll.
        let timeout_secs = cfg.get_u64("REQUEST_TIMEOUT").unwrap_or(60).max(poll_timeout + 10);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, base, token, poll_timeout })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base.trim_end_matches('/'), self.token, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        // Request URLs embed the token; keep them out of error messages.
        let resp = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| e.without_url())?;
        let status = resp.status();
        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("decoding {} response ({})", method, status))?;
        if !parsed.ok {
            bail!(
                "Telegram {} failed: {} - {}",
                method,
                parsed.error_code.unwrap_or(i64::from(status.as_u16())),
                parsed.description.unwrap_or_default()
            );
        }
        parsed
            .result
            .ok_or_else(|| anyhow!("Telegram {} returned no result", method))
    }

    /// Long-poll for updates with id >= `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": self.poll_timeout,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    /// Send `text` as Markdown, falling back to plain text when the markup is rejected.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let markdown = self
            .call::<Value>(
                "sendMessage",
                &json!({ "chat_id": chat_id, "text": text, "parse_mode": "Markdown" }),
            )
            .await;
        if let Err(e) = markdown {
            warn!("Markdown reply rejected, resending as plain text: {}", e);
            self.call::<Value>("sendMessage", &json!({ "chat_id": chat_id, "text": text }))
                .await?;
        }
        Ok(())
    }

    pub async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let info: FileInfo = self.call("getFile", &json!({ "file_id": file_id })).await?;
        let file_path = info
            .file_path
            .ok_or_else(|| anyhow!("Telegram getFile returned no file_path"))?;
        let url = format!(
            "{}/file/bot{}/{}",
            self.base.trim_end_matches('/'),
            self.token,
            file_path
        );
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.without_url())?;
        if !resp.status().is_success() {
            bail!("file download failed: {}", resp.status());
        }
        let bytes = resp.bytes().await.map_err(|e| e.without_url())?;
        Ok(bytes.to_vec())
    }
}
