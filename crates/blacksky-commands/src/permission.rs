//! Role resolution and command authorization.

use crate::entry::{HandlerEntry, Role};
use async_trait::async_trait;
use blacksky_core::{
    config::AuthConfig,
    message::{jid_user, ChatContext},
};
use std::collections::HashSet;
use std::sync::Arc;

/// Maps a sender to a role in a given chat.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn role_of(&self, sender_id: &str, ctx: ChatContext) -> Role;
}

/// Resolves roles from the configured owner and admin phone numbers.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredRoles {
    owners: HashSet<String>,
    admins: HashSet<String>,
}

impl ConfiguredRoles {
    pub fn new<I, J>(owners: I, admins: J) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
    {
        Self {
            owners: owners
                .into_iter()
                .map(|o| jid_user(o.as_ref()).to_string())
                .collect(),
            admins: admins
                .into_iter()
                .map(|a| jid_user(a.as_ref()).to_string())
                .collect(),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(&auth.owners, &auth.admins)
    }
}

#[async_trait]
impl RoleResolver for ConfiguredRoles {
    async fn role_of(&self, sender_id: &str, _ctx: ChatContext) -> Role {
        let user = jid_user(sender_id);
        if self.owners.contains(user) {
            Role::Owner
        } else if self.admins.contains(user) {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// Why a command was refused before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The command is group-only and the chat is direct.
    GroupOnly,
    /// The sender's role is below the command's requirement.
    Role { required: Role, actual: Role },
}

/// Authorizes senders against a command's role and chat requirements.
#[derive(Clone)]
pub struct PermissionGate {
    resolver: Arc<dyn RoleResolver>,
}

impl PermissionGate {
    pub fn new(resolver: Arc<dyn RoleResolver>) -> Self {
        Self { resolver }
    }

    pub async fn authorize(&self, sender_id: &str, required: Role, ctx: ChatContext) -> bool {
        self.resolver
            .role_of(sender_id, ctx)
            .await
            .satisfies(required)
    }

    /// Full gate for one entry: chat type first, then role.
    pub async fn check(
        &self,
        entry: &HandlerEntry,
        sender_id: &str,
        ctx: ChatContext,
    ) -> Result<(), Rejection> {
        if entry.group_only && !ctx.is_group {
            return Err(Rejection::GroupOnly);
        }
        if entry.required_role == Role::User {
            return Ok(());
        }
        let actual = self.resolver.role_of(sender_id, ctx).await;
        if actual.satisfies(entry.required_role) {
            Ok(())
        } else {
            Err(Rejection::Role {
                required: entry.required_role,
                actual,
            })
        }
    }
}
