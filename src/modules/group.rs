//! Group chat helpers. Exported with nested command tables.

use super::reply;
use blacksky_commands::{handler_fn, CommandModule, Export, ExportTable};
use blacksky_core::{
    message::{jid_user, InboundMessage},
    traits::Session,
};
use std::sync::Arc;

const RULES: &str = "*Group rules*\n\
    1. Be respectful.\n\
    2. No spam or flooding commands.\n\
    3. Keep it on topic.";

pub struct Group;

impl CommandModule for Group {
    fn name(&self) -> &str {
        "group"
    }

    fn export(&self) -> anyhow::Result<Export> {
        let info = ExportTable::new()
            .command("groupinfo", handler_fn(groupinfo))
            .command("whoami", handler_fn(whoami));
        let moderation = ExportTable::new().command("rules", handler_fn(rules));
        Ok(ExportTable::new()
            .table(
                "commands",
                ExportTable::new()
                    .table("info", info)
                    .table("moderation", moderation),
            )
            .into())
    }
}

async fn groupinfo(
    session: Arc<dyn Session>,
    msg: InboundMessage,
    _args: Vec<String>,
) -> anyhow::Result<()> {
    reply(&session, &msg.chat_id, &describe_chat(&msg)).await
}

async fn whoami(
    session: Arc<dyn Session>,
    msg: InboundMessage,
    _args: Vec<String>,
) -> anyhow::Result<()> {
    let name = msg.sender_name.as_deref().unwrap_or("unknown");
    let text = format!("{name} ({})", jid_user(&msg.sender_id));
    reply(&session, &msg.chat_id, &text).await
}

async fn rules(
    session: Arc<dyn Session>,
    msg: InboundMessage,
    _args: Vec<String>,
) -> anyhow::Result<()> {
    reply(&session, &msg.chat_id, RULES).await
}

pub(super) fn describe_chat(msg: &InboundMessage) -> String {
    let kind = if msg.context().is_group {
        "group"
    } else {
        "direct"
    };
    format!("Chat: {}\nType: {kind}\nVia: {}", msg.chat_id, msg.channel)
}
