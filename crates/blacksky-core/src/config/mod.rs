mod channels;
mod defaults;


pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::BlackskyError;
use defaults::*;

/// Top-level Blacksky configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub cooldown: CooldownConfig,
    #[serde(default)]
    pub notices: NoticeConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Leading text that marks a message as a command (e.g. `.` or `!`).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            prefix: default_prefix(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Role assignment by phone number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Owner phone numbers (satisfy every role requirement).
    #[serde(default)]
    pub owners: Vec<String>,
    /// Admin phone numbers.
    #[serde(default)]
    pub admins: Vec<String>,
}

/// Reconnect policy for the session gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Cooldown defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Cooldown for commands without an explicit `cooldown` entry.
    #[serde(default = "default_cooldown_secs")]
    pub default_secs: u64,
    /// How often expired cooldown records are swept. 0 disables the sweep.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            default_secs: default_cooldown_secs(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// User-facing rejection notices.
///
/// Placeholders: `{prefix}`, `{command}`, `{seconds}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeConfig {
    #[serde(default = "default_unknown_notice")]
    pub unknown: String,
    #[serde(default = "default_disabled_notice")]
    pub disabled: String,
    #[serde(default = "default_group_only_notice")]
    pub group_only: String,
    #[serde(default = "default_no_permission_notice")]
    pub no_permission: String,
    #[serde(default = "default_cooldown_notice")]
    pub cooldown: String,
    #[serde(default = "default_failed_notice")]
    pub failed: String,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            unknown: default_unknown_notice(),
            disabled: default_disabled_notice(),
            group_only: default_group_only_notice(),
            no_permission: default_no_permission_notice(),
            cooldown: default_cooldown_notice(),
            failed: default_failed_notice(),
        }
    }
}

impl Config {
    /// Expanded data directory.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand(&self.bot.data_dir))
    }

    /// Apply `BLACKSKY_PREFIX` and `BLACKSKY_OWNER` overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("BLACKSKY_PREFIX").ok(),
            std::env::var("BLACKSKY_OWNER").ok(),
        );
    }

    fn apply_overrides(&mut self, prefix: Option<String>, owners: Option<String>) {
        if let Some(prefix) = prefix.filter(|p| !p.trim().is_empty()) {
            self.bot.prefix = prefix.trim().to_string();
        }
        if let Some(owners) = owners {
            let extra = owners
                .split(',')
                .map(|o| o.trim().trim_start_matches('+').to_string())
                .filter(|o| !o.is_empty());
            for owner in extra {
                if !self.auth.owners.contains(&owner) {
                    self.auth.owners.push(owner);
                }
            }
        }
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<(), BlackskyError> {
        if self.bot.prefix.is_empty() || self.bot.prefix.chars().any(char::is_whitespace) {
            return Err(BlackskyError::Config(format!(
                "prefix must be non-empty and contain no whitespace, got {:?}",
                self.bot.prefix
            )));
        }
        if self.gateway.base_delay_ms > self.gateway.max_delay_ms {
            return Err(BlackskyError::Config(format!(
                "gateway.base_delay_ms ({}) exceeds gateway.max_delay_ms ({})",
                self.gateway.base_delay_ms, self.gateway.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, BlackskyError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| BlackskyError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| BlackskyError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
