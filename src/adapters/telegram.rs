use crate::domain::model::{Event, Member, ReplyKind};
use crate::domain::ports::Transport;
use crate::utils::error::{Result, RotationError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;

pub const YES_I_CAN: &str = "Yes I can host the group";
pub const NO_I_CAN_NOT: &str = "No I can not host this week";
pub const REBUFF: &str = "Oh you are trying to be smart. Yeahh no.";

pub fn prompt_text(candidate: &Member) -> String {
    format!(
        "This week it is supposed to be at {}. Is that possible?",
        candidate
    )
}

pub fn confirmation_text(host: &Member) -> String {
    format!("Location selected! This week is hosted by {}", host)
}

/// 只認得兩個鍵盤按鈕的文字
pub fn classify_reply(text: &str) -> ReplyKind {
    match text.trim() {
        YES_I_CAN => ReplyKind::Accept,
        NO_I_CAN_NOT => ReplyKind::Decline,
        _ => ReplyKind::Other,
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Thin Bot API client. Every call is a JSON `POST {base}/bot{token}/{method}`.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    endpoint: String,
    token_masked: String,
}

impl TelegramClient {
    pub fn new(api_base_url: &str, bot_token: &str, poll_timeout: Duration) -> Result<Self> {
        // 長輪詢要比請求逾時短
        let client = Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}", api_base_url.trim_end_matches('/'), bot_token),
            token_masked: mask_token(bot_token),
        })
    }

    pub fn token_masked(&self) -> &str {
        &self.token_masked
    }

    async fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, payload: &P) -> Result<R> {
        tracing::debug!("Calling Telegram method {}", method);
        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, method))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body: ApiResponse<R> = response.json().await?;

        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(RotationError::TelegramApiError {
                method: method.to_string(),
                description: body
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            }),
        }
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<serde_json::Value>,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id,
                    text,
                    reply_markup,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: timeout.as_secs(),
                allowed_updates: ["message"],
            },
        )
        .await
    }
}

fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

/// Sends notices to the bound group chat. The chat is either configured or
/// bound by the first `/start` seen by the poller.
#[derive(Clone)]
pub struct TelegramTransport {
    client: TelegramClient,
    chat: Arc<OnceLock<i64>>,
}

impl TelegramTransport {
    pub fn new(client: TelegramClient, chat_id: Option<i64>) -> Self {
        let chat = Arc::new(OnceLock::new());
        if let Some(id) = chat_id {
            let _ = chat.set(id);
        }
        Self { client, chat }
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.chat.get().copied()
    }

    /// Poller sharing this transport's chat binding.
    pub fn poller(&self, poll_timeout: Duration, retry_delay: Duration) -> UpdatePoller {
        UpdatePoller {
            client: self.client.clone(),
            chat: Arc::clone(&self.chat),
            poll_timeout,
            retry_delay,
            offset: 0,
        }
    }

    async fn send(&self, text: &str, reply_markup: Option<serde_json::Value>) -> Result<()> {
        let chat_id = self
            .chat_id()
            .ok_or_else(|| RotationError::TelegramApiError {
                method: "sendMessage".to_string(),
                description: "No group chat bound yet".to_string(),
            })?;
        self.client.send_message(chat_id, text, reply_markup).await
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_prompt(&self, candidate: &Member) -> Result<()> {
        let keyboard = json!({
            "keyboard": [[{ "text": YES_I_CAN }, { "text": NO_I_CAN_NOT }]],
            "one_time_keyboard": true,
            "resize_keyboard": true,
        });
        self.send(&prompt_text(candidate), Some(keyboard)).await
    }

    async fn send_confirmation(&self, hosted_by: &Member) -> Result<()> {
        self.send(
            &confirmation_text(hosted_by),
            Some(json!({ "remove_keyboard": true })),
        )
        .await
    }

    async fn send_rebuff(&self) -> Result<()> {
        self.send(REBUFF, None).await
    }

    fn is_ready(&self) -> bool {
        self.chat.get().is_some()
    }
}

/// Long-polls `getUpdates` and forwards accept/decline replies as events.
pub struct UpdatePoller {
    client: TelegramClient,
    chat: Arc<OnceLock<i64>>,
    poll_timeout: Duration,
    retry_delay: Duration,
    offset: i64,
}

impl UpdatePoller {
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub async fn run(mut self, events: mpsc::Sender<Event>) {
        tracing::info!(
            "📡 Polling Telegram updates (bot token {})",
            self.client.token_masked()
        );

        loop {
            match self.poll_once().await {
                Ok(batch) => {
                    for event in batch {
                        if events.send(event).await.is_err() {
                            tracing::debug!("Event channel closed, poller stopping");
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Polling failed: {} (retrying in {:?})",
                        e,
                        self.retry_delay
                    );
                    tracing::debug!("💡 {}", e.recovery_suggestion());
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// Fetches one batch of updates and returns the replies worth forwarding.
    pub async fn poll_once(&mut self) -> Result<Vec<Event>> {
        let updates = self.client.get_updates(self.offset, self.poll_timeout).await?;

        let mut events = Vec::new();
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            if let Some(event) = self.interpret(update) {
                events.push(event);
            }
        }
        Ok(events)
    }

    fn interpret(&self, update: Update) -> Option<Event> {
        let message = update.message?;
        let text = message.text?;

        if text.trim().starts_with("/start") {
            if self.chat.set(message.chat.id).is_ok() {
                tracing::info!("💬 Bound to group chat {}", message.chat.id);
            }
            return None;
        }

        if let Some(bound) = self.chat.get() {
            if *bound != message.chat.id {
                tracing::debug!("Ignoring message from foreign chat {}", message.chat.id);
                return None;
            }
        }

        let from = message.from?.username?;
        match classify_reply(&text) {
            ReplyKind::Other => None,
            kind => Some(Event::Reply { from, kind }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reply() {
        assert_eq!(classify_reply(YES_I_CAN), ReplyKind::Accept);
        assert_eq!(classify_reply("  No I can not host this week\n"), ReplyKind::Decline);
        assert_eq!(classify_reply("yes i can host the group"), ReplyKind::Other);
        assert_eq!(classify_reply("hello"), ReplyKind::Other);
    }

    #[test]
    fn test_message_texts() {
        let alice = Member::new("alice");
        assert_eq!(
            prompt_text(&alice),
            "This week it is supposed to be at @alice. Is that possible?"
        );
        assert_eq!(
            confirmation_text(&alice),
            "Location selected! This week is hosted by @alice"
        );
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("123456789:ABCDEFGH"), "1234...EFGH");
        assert_eq!(mask_token("short"), "****");
    }

    #[test]
    fn test_configured_chat_makes_transport_ready() {
        let client =
            TelegramClient::new("http://127.0.0.1:1", "1:x", Duration::from_secs(1)).unwrap();
        assert!(!TelegramTransport::new(client.clone(), None).is_ready());
        assert!(TelegramTransport::new(client, Some(-100)).is_ready());
    }
}
