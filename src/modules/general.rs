//! General commands: ping, echo, uptime. Exported as a bare table.

use super::reply;
use blacksky_commands::{handler_fn, CommandModule, Export, ExportTable};
use blacksky_core::{message::InboundMessage, traits::Session};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct General {
    started: Instant,
}

impl General {
    pub fn new(started: Instant) -> Self {
        Self { started }
    }
}

impl CommandModule for General {
    fn name(&self) -> &str {
        "general"
    }

    fn export(&self) -> anyhow::Result<Export> {
        let started = self.started;
        Ok(ExportTable::new()
            .command("ping", handler_fn(ping))
            .command("echo", handler_fn(echo))
            .command(
                "uptime",
                handler_fn(move |session, msg, _args| async move {
                    let text = format_uptime(started.elapsed());
                    reply(&session, &msg.chat_id, &text).await
                }),
            )
            .value("version", serde_json::json!(env!("CARGO_PKG_VERSION")))
            .into())
    }
}

async fn ping(
    session: Arc<dyn Session>,
    msg: InboundMessage,
    _args: Vec<String>,
) -> anyhow::Result<()> {
    let latency = chrono::Utc::now().timestamp_millis() - msg.timestamp;
    let text = format!("pong ({}ms)", latency.max(0));
    reply(&session, &msg.chat_id, &text).await
}

async fn echo(
    session: Arc<dyn Session>,
    msg: InboundMessage,
    args: Vec<String>,
) -> anyhow::Result<()> {
    let text = if args.is_empty() {
        "Usage: echo <text>".to_string()
    } else {
        args.join(" ")
    };
    reply(&session, &msg.chat_id, &text).await
}

pub(super) fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let secs = secs % 60;
    if days > 0 {
        format!("Up {days}d {hours}h {minutes}m {secs}s")
    } else {
        format!("Up {hours}h {minutes}m {secs}s")
    }
}
