//! Serde default functions for config fields.

pub(super) fn default_name() -> String {
    "Blacksky".to_string()
}

pub(super) fn default_prefix() -> String {
    ".".to_string()
}

pub(super) fn default_data_dir() -> String {
    "~/.blacksky".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_max_retries() -> u32 {
    5
}

pub(super) fn default_base_delay_ms() -> u64 {
    1000
}

pub(super) fn default_max_delay_ms() -> u64 {
    10_000
}

pub(super) fn default_cooldown_secs() -> u64 {
    3
}

pub(super) fn default_sweep_interval() -> u64 {
    300
}

pub(super) fn default_unknown_notice() -> String {
    "Unknown command: {command}. Type {prefix}help to see what I can do.".to_string()
}

pub(super) fn default_disabled_notice() -> String {
    "The {command} command is currently disabled.".to_string()
}

pub(super) fn default_group_only_notice() -> String {
    "The {command} command only works in groups.".to_string()
}

pub(super) fn default_no_permission_notice() -> String {
    "You don't have permission to use {command}.".to_string()
}

pub(super) fn default_cooldown_notice() -> String {
    "Please wait {seconds}s before using {command} again.".to_string()
}

pub(super) fn default_failed_notice() -> String {
    "Something went wrong while running {command}. Please try again later.".to_string()
}
