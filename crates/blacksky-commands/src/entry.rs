//! Handler traits and the registered command entry.

use async_trait::async_trait;
use blacksky_core::{message::InboundMessage, traits::Session};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Caller role, ordered `User < Admin < Owner`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Owner,
}

impl Role {
    /// Whether a caller holding `self` meets a `required` role.
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }

    /// The highest role named in a permissions list (`owner` > `admin` > user).
    pub fn from_permissions(permissions: &[String]) -> Role {
        permissions
            .iter()
            .map(|p| match p.trim().to_lowercase().as_str() {
                "owner" => Role::Owner,
                "admin" => Role::Admin,
                _ => Role::User,
            })
            .max()
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command body. Implementations are free to fail or even panic; the
/// dispatcher contains both.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        session: Arc<dyn Session>,
        message: InboundMessage,
        args: Vec<String>,
    ) -> anyhow::Result<()>;
}

/// Module initializer, run after the module's commands are registered.
/// `Ok(false)` and `Err(_)` both count as a failed init.
#[async_trait]
pub trait ModuleInit: Send + Sync {
    async fn init(&self) -> anyhow::Result<bool>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Arc<dyn Session>, InboundMessage, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn execute(
        &self,
        session: Arc<dyn Session>,
        message: InboundMessage,
        args: Vec<String>,
    ) -> anyhow::Result<()> {
        (self.0)(session, message, args).await
    }
}

/// Wrap an async closure as a [`CommandHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(Arc<dyn Session>, InboundMessage, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

struct FnInit<F>(F);

#[async_trait]
impl<F, Fut> ModuleInit for FnInit<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn init(&self) -> anyhow::Result<bool> {
        (self.0)().await
    }
}

/// Wrap an async closure as a [`ModuleInit`].
pub fn init_fn<F, Fut>(f: F) -> Arc<dyn ModuleInit>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Arc::new(FnInit(f))
}

/// One registered command.
#[derive(Clone)]
pub struct HandlerEntry {
    /// Lower-cased lookup key.
    pub name: String,
    pub handler: Arc<dyn CommandHandler>,
    pub cooldown_secs: u64,
    pub required_role: Role,
    pub group_only: bool,
    /// Help grouping.
    pub category: String,
    pub enabled: bool,
    pub description: Option<String>,
    pub usage: Option<String>,
    /// Module that registered this entry.
    pub module: String,
}

impl HandlerEntry {
    /// Whether two entries carry the same settings and the same handler instance.
    pub fn same_as(&self, other: &HandlerEntry) -> bool {
        self.name == other.name
            && Arc::ptr_eq(&self.handler, &other.handler)
            && self.cooldown_secs == other.cooldown_secs
            && self.required_role == other.required_role
            && self.group_only == other.group_only
            && self.category == other.category
            && self.enabled == other.enabled
            && self.description == other.description
            && self.usage == other.usage
            && self.module == other.module
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("name", &self.name)
            .field("cooldown_secs", &self.cooldown_secs)
            .field("required_role", &self.required_role)
            .field("group_only", &self.group_only)
            .field("category", &self.category)
            .field("enabled", &self.enabled)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Owner.satisfies(Role::Admin));
        assert!(Role::Owner.satisfies(Role::User));
        assert!(Role::Admin.satisfies(Role::User));
        assert!(!Role::User.satisfies(Role::Admin));
        assert!(!Role::Admin.satisfies(Role::Owner));
    }

    #[test]
    fn test_role_from_permissions() {
        assert_eq!(Role::from_permissions(&[]), Role::User);
        assert_eq!(
            Role::from_permissions(&["admin".to_string(), "user".to_string()]),
            Role::Admin
        );
        assert_eq!(
            Role::from_permissions(&["Admin".to_string(), "OWNER".to_string()]),
            Role::Owner
        );
        assert_eq!(Role::from_permissions(&["member".to_string()]), Role::User);
    }
}
