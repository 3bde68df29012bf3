//! Command routing and the authorization wrapper

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::entities::{Command, OperatorSet};
use crate::domain::traits::Transport;

/// A command handler. Handlers reply through the transport themselves;
/// a returned error means the command failed after authorization and is
/// picked up by the error reporter.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, cmd: &Command, transport: &dyn Transport) -> Result<(), BotError>;
}

/// Authorization wrapper: same invocation contract as the handler it wraps,
/// but the inner handler only runs for invokers in the operator set.
///
/// Denial is silent. No reply is sent and no error is raised, so an
/// unauthorized caller cannot distinguish "unknown command" from
/// "unauthorized". The denial is logged with the invoker id.
pub struct Restricted<H> {
    inner: H,
    operators: Arc<OperatorSet>,
}

impl<H> Restricted<H> {
    pub fn new(inner: H, operators: Arc<OperatorSet>) -> Self {
        Self { inner, operators }
    }
}

#[async_trait]
impl<H: CommandHandler> CommandHandler for Restricted<H> {
    async fn handle(&self, cmd: &Command, transport: &dyn Transport) -> Result<(), BotError> {
        let allowed = cmd
            .invoker
            .as_ref()
            .map(|user| self.operators.contains(&user.id))
            .unwrap_or(false);

        if !allowed {
            let who = cmd
                .invoker
                .as_ref()
                .map(|u| u.id.clone())
                .unwrap_or_else(|| "<no invoker>".to_string());
            tracing::info!("Unauthorized access denied for {}", who);
            return Ok(());
        }

        self.inner.handle(cmd, transport).await
    }
}

/// Routes a parsed command to its registered handler by name.
/// Unregistered names are ignored, matching the silence of a denial.
#[derive(Default)]
pub struct CommandRouter {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub async fn dispatch(
        &self,
        cmd: &Command,
        transport: &dyn Transport,
    ) -> Result<(), BotError> {
        match self.handlers.get(&cmd.name) {
            Some(handler) => handler.handle(cmd, transport).await,
            None => {
                tracing::debug!("Ignoring unknown command /{}", cmd.name);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
