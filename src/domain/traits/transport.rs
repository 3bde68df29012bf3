use async_trait::async_trait;

use crate::application::errors::BotError;

/// Outbound text formatting. `Html` maps to whatever rich-text mode the
/// platform supports (Telegram `parse_mode=HTML`); `Plain` sends raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Plain,
    Html,
}

/// Transport trait - abstraction for messaging platform adapters
///
/// The core only needs one capability from the platform: sending a text
/// message to a recipient. Inbound command delivery is the adapter's own
/// poll loop, which hands parsed `Command` values to the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message, returning the platform message id
    async fn send_message(
        &self,
        recipient_id: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<String, BotError>;
}
