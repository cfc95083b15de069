//! Commands every registry carries: `help` and `reload`.

use crate::catalog::CommandConfigSource;
use crate::entry::{CommandHandler, HandlerEntry, Role};
use crate::registry::{build_entry, CommandRegistry, RegistryOptions, RegistrySnapshot};
use async_trait::async_trait;
use blacksky_core::{message::InboundMessage, traits::Session};
use std::sync::{Arc, Weak};

/// Module name reported for built-in entries.
pub(crate) const MODULE: &str = "builtin";

pub(crate) struct Builtin {
    pub name: &'static str,
    handler: Arc<dyn CommandHandler>,
    category: &'static str,
    role: Role,
    description: &'static str,
    usage: &'static str,
}

impl Builtin {
    pub fn entry(
        &self,
        config: &dyn CommandConfigSource,
        options: &RegistryOptions,
    ) -> HandlerEntry {
        let mut entry = build_entry(
            config,
            options,
            self.name,
            self.handler.clone(),
            self.category,
            MODULE,
            self.role,
        );
        if entry.description.is_none() {
            entry.description = Some(self.description.to_string());
        }
        if entry.usage.is_none() {
            entry.usage = Some(format!("{}{}", options.prefix, self.usage));
        }
        entry
    }
}

pub(crate) fn builtins(registry: Weak<CommandRegistry>) -> Vec<Builtin> {
    vec![
        Builtin {
            name: "help",
            handler: Arc::new(Help {
                registry: registry.clone(),
            }),
            category: "general",
            role: Role::User,
            description: "List categories, the commands in a category, or details for one command",
            usage: "help [category|command]",
        },
        Builtin {
            name: "reload",
            handler: Arc::new(Reload { registry }),
            category: "owner",
            role: Role::Owner,
            description: "Rebuild the command registry from all modules",
            usage: "reload",
        },
    ]
}

struct Help {
    registry: Weak<CommandRegistry>,
}

#[async_trait]
impl CommandHandler for Help {
    async fn execute(
        &self,
        session: Arc<dyn Session>,
        message: InboundMessage,
        args: Vec<String>,
    ) -> anyhow::Result<()> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("command registry dropped"))?;
        let text = render_help(
            &registry.snapshot(),
            &registry.options().prefix,
            args.first().map(String::as_str),
        );
        session.send_text(&message.chat_id, &text).await?;
        Ok(())
    }
}

/// Render the help text for an optional topic (category or command name).
pub(crate) fn render_help(
    snapshot: &RegistrySnapshot,
    prefix: &str,
    topic: Option<&str>,
) -> String {
    let categories = snapshot.categories();
    let Some(topic) = topic else {
        let mut out = String::from("*Command categories*\n");
        for (category, entries) in &categories {
            out.push_str(&format!("\n- {category} ({})", entries.len()));
        }
        out.push_str(&format!(
            "\n\nType {prefix}help <category> or {prefix}help <command> for details."
        ));
        return out;
    };

    let topic = topic.trim();
    let key = topic.strip_prefix(prefix).unwrap_or(topic).to_lowercase();

    if let Some(entry) = snapshot.get(&key) {
        return render_entry(&entry, prefix);
    }

    if let Some((category, entries)) = categories
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(&key))
    {
        let mut out = format!("*{category} commands*\n");
        for e in entries {
            out.push_str(&format!("\n- {prefix}{}", e.name));
            if e.required_role != Role::User {
                out.push_str(&format!(" ({})", e.required_role));
            }
            if e.group_only {
                out.push_str(" [group]");
            }
            if !e.enabled {
                out.push_str(" [disabled]");
            }
            if let Some(ref d) = e.description {
                out.push_str(&format!(": {d}"));
            }
        }
        return out;
    }

    format!("No command or category named '{topic}'. Type {prefix}help to list categories.")
}

fn render_entry(entry: &HandlerEntry, prefix: &str) -> String {
    let mut out = format!("*{prefix}{}*\nCategory: {}", entry.name, entry.category);
    if let Some(ref d) = entry.description {
        out.push_str(&format!("\n{d}"));
    }
    if let Some(ref u) = entry.usage {
        out.push_str(&format!("\nUsage: {u}"));
    }
    if entry.cooldown_secs > 0 {
        out.push_str(&format!("\nCooldown: {}s", entry.cooldown_secs));
    }
    if entry.required_role != Role::User {
        out.push_str(&format!("\nRequires: {}", entry.required_role));
    }
    if entry.group_only {
        out.push_str("\nGroups only");
    }
    if !entry.enabled {
        out.push_str("\nCurrently disabled");
    }
    out
}

struct Reload {
    registry: Weak<CommandRegistry>,
}

#[async_trait]
impl CommandHandler for Reload {
    async fn execute(
        &self,
        session: Arc<dyn Session>,
        message: InboundMessage,
        _args: Vec<String>,
    ) -> anyhow::Result<()> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("command registry dropped"))?;
        let report = registry.reload().await;
        let mut text = format!("Reloaded: {}", report.summary());
        for (module, error) in &report.failed {
            text.push_str(&format!("\n- {module}: {error}"));
        }
        session.send_text(&message.chat_id, &text).await?;
        Ok(())
    }
}
