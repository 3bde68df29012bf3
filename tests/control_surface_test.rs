//! End-to-end tests for the gated command surface and failure broadcast
//! Run with: cargo test --test control_surface_test

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;

use ipsentry::application::errors::BotError;
use ipsentry::application::gate::{CommandHandler, CommandRouter, Restricted};
use ipsentry::application::reporter::ErrorReporter;
use ipsentry::domain::entities::{ChatContext, Command, OperatorSet, User};
use ipsentry::domain::traits::{MessageFormat, Transport};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

#[derive(Debug, Clone)]
struct SentMessage {
    recipient: String,
    text: String,
    format: MessageFormat,
}

/// Transport that records every send attempt, optionally failing for
/// selected recipients (the attempt is still recorded).
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    fail_for: HashSet<String>,
}

impl RecordingTransport {
    fn new() -> Self {
        Self::default()
    }

    fn failing_for(recipients: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(
        &self,
        recipient_id: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<String, BotError> {
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient_id.to_string(),
            text: text.to_string(),
            format,
        });
        if self.fail_for.contains(recipient_id) {
            return Err(BotError::Network(format!("{} unreachable", recipient_id)));
        }
        Ok("msg".to_string())
    }
}

/// Handler that counts invocations
struct CountingHandler {
    invocations: Arc<AtomicUsize>,
}

#[async_trait]
impl CommandHandler for CountingHandler {
    async fn handle(&self, _cmd: &Command, _transport: &dyn Transport) -> Result<(), BotError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Handler that always fails
struct FailingHandler;

#[async_trait]
impl CommandHandler for FailingHandler {
    async fn handle(&self, _cmd: &Command, _transport: &dyn Transport) -> Result<(), BotError> {
        Err(BotError::Command("x".to_string()))
    }
}

fn operators(ids: &[&str]) -> Arc<OperatorSet> {
    Arc::new(OperatorSet::new(ids.iter().map(|s| s.to_string())).expect("non-empty"))
}

fn command_from(invoker_id: &str) -> Command {
    Command::new("ip")
        .with_invoker(User::new(invoker_id).with_first_name("Someone"))
        .with_chat(ChatContext::new("chat-1"))
}

#[tokio::test]
async fn non_operator_is_denied_silently() {
    ensure_init();

    let invocations = Arc::new(AtomicUsize::new(0));
    let ops = operators(&["1", "2", "3"]);
    let mut router = CommandRouter::new();
    router.register(
        "ip",
        Restricted::new(
            CountingHandler {
                invocations: invocations.clone(),
            },
            ops,
        ),
    );

    let transport = RecordingTransport::new();
    let result = router.dispatch(&command_from("4"), &transport).await;

    assert!(result.is_ok(), "denial must not surface an error");
    assert_eq!(invocations.load(Ordering::SeqCst), 0, "handler body must not run");
    assert!(transport.sent().is_empty(), "denial must send no reply");
}

#[tokio::test]
async fn operator_runs_handler_exactly_once() {
    ensure_init();

    let invocations = Arc::new(AtomicUsize::new(0));
    let ops = operators(&["1", "2"]);
    let mut router = CommandRouter::new();
    router.register(
        "ip",
        Restricted::new(
            CountingHandler {
                invocations: invocations.clone(),
            },
            ops,
        ),
    );

    let transport = RecordingTransport::new();
    router
        .dispatch(&command_from("2"), &transport)
        .await
        .expect("authorized dispatch succeeds");

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn command_without_invoker_is_denied() {
    ensure_init();

    let invocations = Arc::new(AtomicUsize::new(0));
    let mut router = CommandRouter::new();
    router.register(
        "ip",
        Restricted::new(
            CountingHandler {
                invocations: invocations.clone(),
            },
            operators(&["1"]),
        ),
    );

    let cmd = Command::new("ip").with_chat(ChatContext::new("chat-1"));
    let transport = RecordingTransport::new();
    router.dispatch(&cmd, &transport).await.expect("silent deny");

    assert_eq!(invocations.load(Ordering::SeqCst), 0);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn unknown_command_is_ignored() {
    ensure_init();

    let router = CommandRouter::new();
    let transport = RecordingTransport::new();
    let result = router.dispatch(&command_from("1"), &transport).await;

    assert!(result.is_ok());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn failure_broadcasts_to_every_operator_then_propagates() {
    ensure_init();

    let ops = operators(&["1", "2"]);
    let mut router = CommandRouter::new();
    router.register("ip", Restricted::new(FailingHandler, ops.clone()));
    let reporter = ErrorReporter::new(ops);

    let transport = RecordingTransport::new();
    let cmd = command_from("1");

    let result = router.dispatch(&cmd, &transport).await;
    let result = reporter.guard(&transport, Some(&cmd), result).await;

    let err = result.expect_err("original failure must propagate after the broadcast");
    assert!(err.to_string().contains("x"));

    let sent = transport.sent();

    // First an invoker notice to the originating chat, in plain text
    assert_eq!(sent[0].recipient, "chat-1");
    assert_eq!(sent[0].format, MessageFormat::Plain);
    assert!(sent[0].text.contains("error happened"));

    // Then exactly one HTML report per operator, distinct recipients
    let reports: Vec<&SentMessage> = sent.iter().skip(1).collect();
    assert_eq!(reports.len(), 2);
    let recipients: HashSet<&str> = reports.iter().map(|m| m.recipient.as_str()).collect();
    assert_eq!(recipients, HashSet::from(["1", "2"]));
    for report in &reports {
        assert_eq!(report.format, MessageFormat::Html);
        assert!(report.text.contains("x"), "report carries the error text");
        assert!(report.text.contains("traceback"), "report carries a trace");
    }
}

#[tokio::test]
async fn one_failed_delivery_does_not_abort_the_broadcast() {
    ensure_init();

    let ops = operators(&["1", "2", "3"]);
    let reporter = ErrorReporter::new(ops);
    let transport = RecordingTransport::failing_for(&["2"]);

    let cmd = command_from("1");
    let result = reporter
        .guard(
            &transport,
            Some(&cmd),
            Err(BotError::Command("boom".to_string())),
        )
        .await;

    assert!(result.is_err());

    let recipients: HashSet<String> = transport
        .sent()
        .iter()
        .skip(1) // invoker notice
        .map(|m| m.recipient.clone())
        .collect();
    assert_eq!(
        recipients,
        HashSet::from(["1".to_string(), "2".to_string(), "3".to_string()]),
        "every operator gets a delivery attempt"
    );
}

#[tokio::test]
async fn failure_without_chat_skips_the_invoker_notice() {
    ensure_init();

    let ops = operators(&["1"]);
    let reporter = ErrorReporter::new(ops);
    let transport = RecordingTransport::new();

    let cmd = Command::new("ip").with_invoker(User::new("1"));
    let result = reporter
        .guard(
            &transport,
            Some(&cmd),
            Err(BotError::Command("boom".to_string())),
        )
        .await;

    assert!(result.is_err());
    let sent = transport.sent();
    assert_eq!(sent.len(), 1, "only the operator report, no invoker notice");
    assert_eq!(sent[0].recipient, "1");
    assert_eq!(sent[0].format, MessageFormat::Html);
}

#[tokio::test]
async fn guard_passes_success_through_untouched() {
    ensure_init();

    let reporter = ErrorReporter::new(operators(&["1"]));
    let transport = RecordingTransport::new();

    let result = reporter.guard(&transport, None, Ok(())).await;

    assert!(result.is_ok());
    assert!(transport.sent().is_empty());
}
