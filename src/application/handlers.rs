//! The command surface: a liveness no-op and the privileged IP lookup.
//! Both are registered behind [`Restricted`](crate::application::gate::Restricted).

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::application::gate::CommandHandler;
use crate::domain::entities::Command;
use crate::domain::traits::{MessageFormat, Transport};
use crate::infrastructure::resolver::AddressResolver;

/// `/ping` - replies "pong" so an operator can check the bot is alive
pub struct PingHandler;

#[async_trait]
impl CommandHandler for PingHandler {
    async fn handle(&self, cmd: &Command, transport: &dyn Transport) -> Result<(), BotError> {
        let Some(chat_id) = cmd.reply_chat_id() else {
            return Ok(());
        };
        transport
            .send_message(chat_id, "pong", MessageFormat::Plain)
            .await?;
        Ok(())
    }
}

/// `/ip` - resolves the host's current public address and replies with it.
/// Exhausting every source is a normal negative outcome, answered with a
/// plain "could not resolve" message rather than an error.
pub struct IpHandler {
    resolver: Arc<AddressResolver>,
}

impl IpHandler {
    pub fn new(resolver: Arc<AddressResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl CommandHandler for IpHandler {
    async fn handle(&self, cmd: &Command, transport: &dyn Transport) -> Result<(), BotError> {
        let Some(chat_id) = cmd.reply_chat_id() else {
            return Ok(());
        };

        let reply = match self.resolver.resolve().await {
            Some(ip) => ip.to_string(),
            None => "Could not resolve the public IP address".to_string(),
        };

        transport
            .send_message(chat_id, &reply, MessageFormat::Plain)
            .await?;
        Ok(())
    }
}
