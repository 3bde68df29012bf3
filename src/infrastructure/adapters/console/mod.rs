//! Console adapter for development/testing

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::traits::{MessageFormat, Transport};

/// Console transport for local development. Outbound messages are printed;
/// recipients are shown but not distinguished.
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }

    pub fn read_line(&self, prompt: &str) -> Option<String> {
        use std::io::Write;
        print!("{}", prompt);
        std::io::stdout().flush().ok()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok()?;
        if input.is_empty() {
            return None; // EOF
        }
        Some(input.trim().to_string())
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_message(
        &self,
        recipient_id: &str,
        text: &str,
        _format: MessageFormat,
    ) -> Result<String, BotError> {
        println!("[BOT -> {}] {}", recipient_id, text);
        Ok("console_msg".to_string())
    }
}
