//! Dispatcher: turns prefixed chat messages into gated handler invocations.

mod parse;


pub use parse::{parse_invocation, render_notice, Invocation};

use blacksky_commands::{CommandRegistry, CooldownLedger, PermissionGate, Rejection};
use blacksky_core::{config::NoticeConfig, message::InboundMessage, traits::Session};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Why a command was not run. Each refusal sends exactly one notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    Unknown,
    Disabled,
    GroupOnly,
    NoPermission,
    Cooldown { remaining_secs: u64 },
}

/// Result of dispatching one message.
#[derive(Debug)]
pub enum Outcome {
    /// Not a command: nothing was looked up or sent.
    Ignored,
    Refused(Refusal),
    /// The handler is running; the task resolves once it finished and any
    /// failure notice was sent.
    Started(JoinHandle<()>),
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    cooldowns: Arc<CooldownLedger>,
    gate: PermissionGate,
    prefix: String,
    notices: NoticeConfig,
    clock: Clock,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        cooldowns: Arc<CooldownLedger>,
        gate: PermissionGate,
        prefix: impl Into<String>,
        notices: NoticeConfig,
    ) -> Self {
        Self {
            registry,
            cooldowns,
            gate,
            prefix: prefix.into(),
            notices,
            clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Replace the wall clock (epoch milliseconds) used for cooldowns.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Gate and run one message. Never fails: rejections become notices and
    /// handler errors or panics are contained in the handler's task.
    ///
    /// Everything up to the cooldown record runs before this returns, so
    /// messages dispatched in order are gated in order.
    pub async fn dispatch(&self, session: Arc<dyn Session>, message: InboundMessage) -> Outcome {
        let Some(text) = message.raw_text.as_deref() else {
            return Outcome::Ignored;
        };
        let Some(invocation) = parse_invocation(text, &self.prefix) else {
            return Outcome::Ignored;
        };
        let Invocation { command, args } = invocation;

        let Some(entry) = self.registry.get(&command) else {
            debug!(
                "dispatch: unknown command '{command}' from {}",
                message.sender_id
            );
            return self.refuse(&session, &message, &command, Refusal::Unknown).await;
        };

        if !entry.enabled {
            return self.refuse(&session, &message, &command, Refusal::Disabled).await;
        }

        let ctx = message.context();
        match self.gate.check(&entry, &message.sender_id, ctx).await {
            Ok(()) => {}
            Err(Rejection::GroupOnly) => {
                return self.refuse(&session, &message, &command, Refusal::GroupOnly).await;
            }
            Err(Rejection::Role { required, actual }) => {
                info!(
                    "dispatch: {} ({actual}) denied '{command}' (requires {required})",
                    message.sender_id
                );
                return self.refuse(&session, &message, &command, Refusal::NoPermission).await;
            }
        }

        let now = (self.clock)();
        let cooldown = self.cooldowns.check(&entry.name, &message.sender_id, now);
        if !cooldown.allowed {
            let refusal = Refusal::Cooldown {
                remaining_secs: cooldown.remaining_secs,
            };
            return self.refuse(&session, &message, &command, refusal).await;
        }
        self.cooldowns
            .record(&entry.name, &message.sender_id, entry.cooldown_secs, now);

        info!(
            "dispatch: {}{command} from {} in {}",
            self.prefix, message.sender_id, message.chat_id
        );

        let failed_notice = self.render(&self.notices.failed, &command, 0);
        let chat_id = message.chat_id.clone();
        let sender_id = message.sender_id.clone();
        let handler = entry.handler.clone();
        let handler_session = session.clone();
        let task = async move { handler.execute(handler_session, message, args).await };
        let run = tokio::spawn(task);

        Outcome::Started(tokio::spawn(async move {
            let failure = match run.await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => format!("{e:#}"),
                Err(e) if e.is_panic() => "handler panicked".to_string(),
                Err(e) => e.to_string(),
            };
            error!("dispatch: '{command}' from {sender_id} failed: {failure}");
            notify(session.as_ref(), &chat_id, &failed_notice).await;
        }))
    }

    async fn refuse(
        &self,
        session: &Arc<dyn Session>,
        message: &InboundMessage,
        command: &str,
        refusal: Refusal,
    ) -> Outcome {
        let (template, seconds) = match refusal {
            Refusal::Unknown => (&self.notices.unknown, 0),
            Refusal::Disabled => (&self.notices.disabled, 0),
            Refusal::GroupOnly => (&self.notices.group_only, 0),
            Refusal::NoPermission => (&self.notices.no_permission, 0),
            Refusal::Cooldown { remaining_secs } => (&self.notices.cooldown, remaining_secs),
        };
        let text = self.render(template, command, seconds);
        notify(session.as_ref(), &message.chat_id, &text).await;
        Outcome::Refused(refusal)
    }

    fn render(&self, template: &str, command: &str, seconds: u64) -> String {
        render_notice(template, &self.prefix, command, seconds)
    }
}

async fn notify(session: &dyn Session, chat_id: &str, text: &str) {
    if let Err(e) = session.send_text(chat_id, text).await {
        warn!("dispatch: failed to send notice to {chat_id}: {e}");
    }
}
