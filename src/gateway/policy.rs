//! Close classification and reconnect backoff.

use blacksky_core::{config::GatewayConfig, traits::CloseInfo};
use std::fmt;
use std::time::Duration;

/// Why a connection closed, as far as reconnect policy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectKind {
    /// The device was unlinked; stored credentials are useless.
    LoggedOut,
    RateLimited,
    /// Network hiccups and server-requested restarts.
    Transient,
    Unknown,
}

impl DisconnectKind {
    /// Classify by multi-device close code, falling back to the reason text.
    pub fn classify(info: &CloseInfo) -> Self {
        match info.code {
            Some(401) => Self::LoggedOut,
            Some(429) => Self::RateLimited,
            Some(408 | 428 | 440 | 500 | 503 | 515) => Self::Transient,
            Some(_) => Self::Unknown,
            None => Self::from_reason(&info.reason),
        }
    }

    fn from_reason(reason: &str) -> Self {
        let reason = reason.to_lowercase();
        if reason.contains("logged out") {
            Self::LoggedOut
        } else if reason.contains("rate") {
            Self::RateLimited
        } else if ["timed out", "connection closed", "restart"]
            .iter()
            .any(|k| reason.contains(k))
        {
            Self::Transient
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged_out",
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DisconnectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Reconnect {
        delay: Duration,
        clear_credentials: bool,
    },
    /// Retries exhausted; the session needs an external restart.
    GiveUp,
}

/// Capped exponential backoff with a retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// `min(2^retry * base, max)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Decide on a close of `kind`, updating `retry_count` in place.
    pub fn decide(&self, kind: DisconnectKind, retry_count: &mut u32) -> Decision {
        if kind == DisconnectKind::LoggedOut {
            *retry_count = 0;
            return Decision::Reconnect {
                delay: Duration::ZERO,
                clear_credentials: true,
            };
        }
        if *retry_count >= self.max_retries {
            return Decision::GiveUp;
        }
        let delay = self.backoff(*retry_count);
        *retry_count += 1;
        Decision::Reconnect {
            delay,
            clear_credentials: false,
        }
    }
}
