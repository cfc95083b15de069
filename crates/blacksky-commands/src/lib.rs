//! # blacksky-commands
//!
//! Command handling for Blacksky: heterogeneous command modules are normalized
//! into a flat, reloadable registry of [`HandlerEntry`] values, gated by a
//! per-sender [`CooldownLedger`] and a role-based [`PermissionGate`].

mod builtin;
mod catalog;
mod cooldown;
mod entry;
mod module;
mod permission;
mod registry;

#[cfg(test)]
mod testing;

// Re-export public API; all consumers use `blacksky_commands::*` paths.
pub use catalog::{
    install_bundled_catalog, parse_records, CommandCatalog, CommandConfigSource, CommandOverrides,
    CommandRecord,
};
pub use cooldown::{CooldownCheck, CooldownLedger};
pub use entry::{handler_fn, init_fn, CommandHandler, HandlerEntry, ModuleInit, Role};
pub use module::{
    CommandModule, Export, ExportTable, ModuleAdapter, NormalizedModule, StaticModule,
};
pub use permission::{ConfiguredRoles, PermissionGate, Rejection, RoleResolver};
pub use registry::{
    Collision, CommandRegistry, LoadReport, RegistryOptions, RegistrySnapshot, RegistryStats,
};
