// src/notify/telegram.rs
use anyhow::{anyhow, Result};
use reqwest::Client;
use std::time::Duration;

use crate::scan::types::{ClassifiedItem, TrackedSource};

use super::Notifier;

/// Posts one message (photo with caption when the ad has an image) per chat id
/// via the Telegram Bot API, with a small bounded retry on transient errors.
#[derive(Clone)]
pub struct TelegramNotifier {
    token: Option<String>,
    chat_ids: Vec<String>,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_ids: Vec<String>) -> Self {
        Self {
            token: Some(token),
            chat_ids,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    /// Reads TELEGRAM_TOKEN and comma-separated CHAT_IDS. Missing token means
    /// the notifier is disabled (sends become no-ops), which keeps local runs
    /// without credentials from failing.
    pub fn from_env() -> Self {
        let token = std::env::var("TELEGRAM_TOKEN").ok();
        let chat_ids = std::env::var("CHAT_IDS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            token,
            chat_ids,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    fn caption(source: &TrackedSource, item: &ClassifiedItem) -> String {
        let mut lines = vec![format!("📌 *{}*", item.raw.title)];
        if let Some(price) = &item.raw.price {
            lines.push(format!("💰 {price}"));
        }
        if let Some(location) = &item.raw.location {
            lines.push(format!("📍 {location}"));
        }
        lines.push(format!("📆 {}", item.raw.posted_at));
        lines.push(format!("\n🔗 [Visit site]({})", item.raw.id));
        if !source.hashtag.is_empty() {
            lines.push(format!("\n{}", source.hashtag));
        }
        lines.join("\n")
    }

    async fn post_with_retry(&self, url: &str, payload: &serde_json::Value) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(url)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("Telegram HTTP error: {e}"));
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("Telegram request failed: {e}"));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, source: &TrackedSource, item: &ClassifiedItem) -> Result<()> {
        let Some(token) = &self.token else {
            tracing::debug!("Telegram disabled (no TELEGRAM_TOKEN)");
            return Ok(());
        };

        let caption = Self::caption(source, item);
        for chat_id in &self.chat_ids {
            let (url, payload) = match &item.raw.image_url {
                Some(photo) => (
                    format!("https://api.telegram.org/bot{token}/sendPhoto"),
                    serde_json::json!({
                        "chat_id": chat_id,
                        "photo": photo,
                        "caption": caption,
                        "parse_mode": "Markdown",
                    }),
                ),
                None => (
                    format!("https://api.telegram.org/bot{token}/sendMessage"),
                    serde_json::json!({
                        "chat_id": chat_id,
                        "text": caption,
                        "parse_mode": "Markdown",
                    }),
                ),
            };
            self.post_with_retry(&url, &payload).await?;
        }
        Ok(())
    }
}
