//! Failure capture and operator broadcast
//!
//! Wraps handler execution: on failure it notifies the invoker (best
//! effort), builds a diagnostic payload from whatever command metadata is
//! available, fans it out to every operator, and hands the original error
//! back to the dispatch loop for centralized logging.

use std::backtrace::Backtrace;
use std::error::Error as _;
use std::sync::Arc;

use chrono::Utc;

use crate::application::errors::BotError;
use crate::domain::entities::{Command, OperatorSet};
use crate::domain::traits::{MessageFormat, Transport};

/// Telegram caps messages at 4096 chars; leave headroom for the markup.
const MAX_TRACE_CHARS: usize = 3000;

const INVOKER_NOTICE: &str = "Hey. I'm sorry to inform you that an error happened \
while I tried to handle your command. My developer(s) will be notified.";

pub struct ErrorReporter {
    operators: Arc<OperatorSet>,
}

impl ErrorReporter {
    pub fn new(operators: Arc<OperatorSet>) -> Self {
        Self { operators }
    }

    /// Two-phase failure contract: observe-and-report, then propagate.
    /// On `Ok` this is a no-op; on `Err` the failure is broadcast and the
    /// original error is returned unchanged for the caller to log.
    pub async fn guard(
        &self,
        transport: &dyn Transport,
        cmd: Option<&Command>,
        result: Result<(), BotError>,
    ) -> Result<(), BotError> {
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                self.report(transport, cmd, &err).await;
                Err(err)
            }
        }
    }

    /// Fire-and-forget invoker notice, then one send per operator.
    /// A failed send to one operator never blocks the rest.
    async fn report(&self, transport: &dyn Transport, cmd: Option<&Command>, err: &BotError) {
        if let Some(chat_id) = cmd.and_then(|c| c.reply_chat_id()) {
            if let Err(notice_err) = transport
                .send_message(chat_id, INVOKER_NOTICE, MessageFormat::Plain)
                .await
            {
                tracing::debug!("Could not notify invoker of failure: {}", notice_err);
            }
        }

        let payload = DiagnosticPayload::from_failure(cmd, err);
        let text = payload.render_html();

        for operator in self.operators.iter() {
            if let Err(send_err) = transport
                .send_message(operator, &text, MessageFormat::Html)
                .await
            {
                tracing::warn!("Failed to deliver error report to {}: {}", operator, send_err);
            }
        }
    }
}

/// Structured failure report, built only when a gated handler fails and
/// discarded after the broadcast.
pub struct DiagnosticPayload {
    error: String,
    context: String,
    trace: String,
    occurred_at: chrono::DateTime<Utc>,
}

impl DiagnosticPayload {
    pub fn from_failure(cmd: Option<&Command>, err: &BotError) -> Self {
        Self {
            error: err.to_string(),
            context: context_fragment(cmd),
            trace: trace_text(err),
            occurred_at: Utc::now(),
        }
    }

    /// Render the broadcast message in Telegram HTML
    pub fn render_html(&self) -> String {
        format!(
            "Hey.\nThe error <code>{}</code> happened{} at {}. The full traceback:\n\n<code>{}</code>",
            escape_html(&self.error),
            self.context,
            self.occurred_at.format("%Y-%m-%d %H:%M:%S UTC"),
            escape_html(&self.trace),
        )
    }
}

/// Concatenate whatever metadata the command carried, in a fixed order:
/// invoker mention, chat title (and handle), poll id. Absent data
/// contributes nothing.
fn context_fragment(cmd: Option<&Command>) -> String {
    let mut payload = String::new();
    let Some(cmd) = cmd else {
        return payload;
    };

    if let Some(user) = &cmd.invoker {
        payload.push_str(&format!(
            " with the user {}",
            mention_html(&user.id, &user.display_name())
        ));
    }
    if let Some(chat) = &cmd.chat {
        if let Some(title) = &chat.title {
            payload.push_str(&format!(" within the chat <i>{}</i>", escape_html(title)));
            if let Some(username) = &chat.username {
                payload.push_str(&format!(" (@{})", username));
            }
        }
    }
    if let Some(poll_id) = &cmd.poll_id {
        payload.push_str(&format!(" with the poll id {}", poll_id));
    }

    payload
}

/// Error chain plus a backtrace captured at report time, bounded so the
/// rendered message stays under the platform size limit.
fn trace_text(err: &BotError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(&format!("\ncaused by: {}", cause));
        source = cause.source();
    }

    text.push_str("\n\n");
    text.push_str(&Backtrace::force_capture().to_string());

    if text.len() > MAX_TRACE_CHARS {
        let mut cut = MAX_TRACE_CHARS;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("\n[truncated]");
    }
    text
}

/// Telegram user mention in HTML form
fn mention_html(user_id: &str, name: &str) -> String {
    format!("<a href=\"tg://user?id={}\">{}</a>", user_id, escape_html(name))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
