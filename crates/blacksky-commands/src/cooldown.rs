//! Per-command, per-sender cooldown tracking.

use dashmap::DashMap;

/// Result of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownCheck {
    pub allowed: bool,
    /// Whole seconds until the command is usable again (0 when allowed).
    pub remaining_secs: u64,
}

/// Expiry timestamps keyed by `(command, sender)`.
///
/// The wall clock passed to [`check`](Self::check) is authoritative; eviction
/// only bounds memory.
#[derive(Debug, Default)]
pub struct CooldownLedger {
    expires_at: DashMap<(String, String), i64>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, command: &str, sender_id: &str, now_ms: i64) -> CooldownCheck {
        let key = (command.to_string(), sender_id.to_string());
        // Copy out so no shard guard is held across the removal below.
        let expires = self.expires_at.get(&key).map(|e| *e);
        match expires {
            Some(exp) if now_ms < exp => CooldownCheck {
                allowed: false,
                remaining_secs: ((exp - now_ms) as u64).div_ceil(1000),
            },
            Some(_) => {
                self.expires_at.remove_if(&key, |_, exp| now_ms >= *exp);
                CooldownCheck {
                    allowed: true,
                    remaining_secs: 0,
                }
            }
            None => CooldownCheck {
                allowed: true,
                remaining_secs: 0,
            },
        }
    }

    /// Set the expiry for `(command, sender)`, replacing any earlier one.
    ///
    /// A zero cooldown expires immediately, so the key is dropped instead.
    pub fn record(&self, command: &str, sender_id: &str, cooldown_secs: u64, now_ms: i64) {
        let key = (command.to_string(), sender_id.to_string());
        if cooldown_secs == 0 {
            self.expires_at.remove(&key);
            return;
        }
        let cooldown_ms = i64::try_from(cooldown_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        self.expires_at
            .insert(key, now_ms.saturating_add(cooldown_ms));
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn sweep(&self, now_ms: i64) -> usize {
        let before = self.expires_at.len();
        self.expires_at.retain(|_, exp| *exp > now_ms);
        before.saturating_sub(self.expires_at.len())
    }

    pub fn len(&self) -> usize {
        self.expires_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expires_at.is_empty()
    }
}
