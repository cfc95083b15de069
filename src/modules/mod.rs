//! Command modules shipped with the bot. Each exports its commands in one of
//! the layouts the registry accepts.

mod fun;
mod general;
mod group;

#[cfg(test)]
mod tests;

use blacksky_commands::CommandModule;
use blacksky_core::traits::Session;
use std::sync::Arc;
use std::time::Instant;

/// Category files installed into `{data_dir}/commands/` on first run.
pub const BUNDLED_CATALOG: &[(&str, &str)] = &[
    ("fun.json", include_str!("../../catalog/fun.json")),
    ("general.json", include_str!("../../catalog/general.json")),
    ("group.json", include_str!("../../catalog/group.json")),
];

/// Every shipped module, in registration order.
pub fn all(started: Instant) -> Vec<Arc<dyn CommandModule>> {
    vec![
        Arc::new(general::General::new(started)),
        Arc::new(fun::Fun),
        Arc::new(group::Group),
    ]
}

/// Reply in the chat a message came from.
pub(crate) async fn reply(
    session: &Arc<dyn Session>,
    chat_id: &str,
    text: &str,
) -> anyhow::Result<()> {
    session.send_text(chat_id, text).await?;
    Ok(())
}
