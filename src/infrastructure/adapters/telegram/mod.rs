//! Telegram adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::errors::BotError;
use crate::domain::entities::{ChatContext, Command, User as DomainUser};
use crate::domain::traits::{MessageFormat, Transport};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub poll: Option<Poll>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Poll {
    pub id: String,
}

/// Telegram bot adapter
pub struct TelegramTransport {
    token: String,
    client: Client,
}

impl TelegramTransport {
    /// Build the adapter; `proxy` routes all Bot API traffic when set
    pub fn new(token: impl Into<String>, proxy: Option<&str>) -> Result<Self, BotError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(60));
        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| BotError::Internal(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| BotError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            token: token.into(),
            client,
        })
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    /// Fetch the bot's username from the Telegram API
    pub async fn fetch_username(&self) -> Result<String, BotError> {
        #[derive(Deserialize)]
        struct Response {
            result: Me,
        }

        #[derive(Deserialize)]
        struct Me {
            username: String,
        }

        let url = self.api_url("getMe");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let data: Response = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        Ok(data.result.username)
    }

    /// Get updates from Telegram using the getUpdates long poll
    pub async fn get_updates(&self, offset: i64, timeout: i64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: i64,
            allowed_updates: Vec<String>,
        }

        #[derive(Deserialize)]
        struct Response {
            result: Vec<Update>,
        }

        let url = self.api_url("getUpdates");
        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message".to_string(), "poll".to_string()],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Network(format!(
                "Telegram API error: {}",
                response.status()
            )));
        }

        let data: Response = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        Ok(data.result)
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update]) -> i64 {
        updates.iter().map(|u| u.update_id + 1).max().unwrap_or(0)
    }

    /// Register the command surface with Telegram so clients offer completion
    pub async fn register_commands(&self) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct BotCommand {
            command: String,
            description: String,
        }

        #[derive(Serialize)]
        struct SetMyCommandsRequest {
            commands: Vec<BotCommand>,
        }

        let commands = vec![
            BotCommand {
                command: "ping".to_string(),
                description: "Check bot is alive".to_string(),
            },
            BotCommand {
                command: "ip".to_string(),
                description: "Show the host's public IP address".to_string(),
            },
        ];

        let url = self.api_url("setMyCommands");
        let request = SetMyCommandsRequest { commands };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(BotError::Network(format!(
                "Failed to register commands: {}",
                error
            )));
        }

        tracing::info!("Registered bot commands with Telegram");
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(
        &self,
        recipient_id: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<String, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest {
            chat_id: String,
            text: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            parse_mode: Option<String>,
        }

        #[derive(Deserialize)]
        struct Response {
            result: MessageResult,
        }

        #[derive(Deserialize)]
        struct MessageResult {
            message_id: i64,
        }

        let parse_mode = match format {
            MessageFormat::Plain => None,
            MessageFormat::Html => Some("HTML".to_string()),
        };

        let url = self.api_url("sendMessage");
        let request = SendMessageRequest {
            chat_id: recipient_id.to_string(),
            text: text.to_string(),
            parse_mode,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Network(format!(
                "Telegram API error: {}",
                response.status()
            )));
        }

        let data: Response = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        Ok(data.result.message_id.to_string())
    }
}

/// Parse an update into a core Command, or `None` when the update carries
/// no command text (plain messages, bare poll updates).
///
/// Commands look like `/name arg1 arg2`, optionally suffixed `@botname`
/// in group chats; the suffix is stripped regardless of which bot it
/// names, since the router ignores unknown commands anyway.
pub fn parse_command(update: &Update) -> Option<Command> {
    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?.trim();
    let rest = text.strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let raw_name = parts.next()?;
    let name = raw_name.split('@').next().unwrap_or(raw_name);
    if name.is_empty() {
        return None;
    }
    let args: Vec<String> = parts.map(|s| s.to_string()).collect();

    let mut cmd = Command::new(name).with_args(args);

    if let Some(from) = &message.from {
        let mut user = DomainUser::new(from.id.to_string());
        if let Some(username) = &from.username {
            user = user.with_username(username.clone());
        }
        if let Some(first) = &from.first_name {
            user = user.with_first_name(first.clone());
        }
        cmd = cmd.with_invoker(user);
    }

    let mut chat = ChatContext::new(message.chat.id.to_string());
    if let Some(title) = &message.chat.title {
        chat = chat.with_title(title.clone());
    }
    if let Some(username) = &message.chat.username {
        chat = chat.with_username(username.clone());
    }
    cmd = cmd.with_chat(chat);

    if let Some(poll) = &update.poll {
        cmd = cmd.with_poll_id(poll.id.clone());
    }

    Some(cmd)
}
