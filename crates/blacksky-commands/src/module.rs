//! Command modules and shape normalization.
//!
//! Modules describe their exports as an [`Export`] tree. Three layouts are
//! accepted and flattened into a [`NormalizedModule`]:
//!
//! - a bare table whose handler entries are the commands;
//! - `{ commands = {...}, category = "...", init = ... }`;
//! - a table whose `commands` entry nests further tables, flattened depth-first.

use crate::entry::{CommandHandler, ModuleInit};
use blacksky_core::error::BlackskyError;
use std::sync::Arc;

/// One exported value of a command module.
#[derive(Clone)]
pub enum Export {
    Handler(Arc<dyn CommandHandler>),
    Init(Arc<dyn ModuleInit>),
    Value(serde_json::Value),
    Table(ExportTable),
}

/// Insertion-ordered string-keyed table of exports.
#[derive(Clone, Default)]
pub struct ExportTable {
    entries: Vec<(String, Export)>,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: Export) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Export> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Export)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn command(mut self, name: &str, handler: Arc<dyn CommandHandler>) -> Self {
        self.insert(name, Export::Handler(handler));
        self
    }

    pub fn init(mut self, init: Arc<dyn ModuleInit>) -> Self {
        self.insert("init", Export::Init(init));
        self
    }

    pub fn value(mut self, key: &str, value: serde_json::Value) -> Self {
        self.insert(key, Export::Value(value));
        self
    }

    pub fn table(mut self, key: &str, table: ExportTable) -> Self {
        self.insert(key, Export::Table(table));
        self
    }
}

impl From<ExportTable> for Export {
    fn from(table: ExportTable) -> Self {
        Export::Table(table)
    }
}

/// A source of commands. `export` may fail; the registry isolates the failure.
pub trait CommandModule: Send + Sync {
    fn name(&self) -> &str;
    fn export(&self) -> anyhow::Result<Export>;
}

/// A module whose exports are fixed at construction.
pub struct StaticModule {
    name: String,
    export: Export,
}

impl StaticModule {
    pub fn new(name: impl Into<String>, export: impl Into<Export>) -> Self {
        Self {
            name: name.into(),
            export: export.into(),
        }
    }
}

impl CommandModule for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn export(&self) -> anyhow::Result<Export> {
        Ok(self.export.clone())
    }
}

/// Uniform module shape consumed by the registry.
pub struct NormalizedModule {
    pub name: String,
    /// Commands in export order; later duplicates win at registration.
    pub commands: Vec<(String, Arc<dyn CommandHandler>)>,
    pub category: String,
    pub init: Option<Arc<dyn ModuleInit>>,
}

/// Shape detection for raw module exports.
pub struct ModuleAdapter;

impl ModuleAdapter {
    pub fn normalize(raw: Export, module_name: &str) -> Result<NormalizedModule, BlackskyError> {
        let table = match raw {
            Export::Table(table) => table,
            Export::Handler(_) => {
                return Err(BlackskyError::Command(format!(
                    "module '{module_name}' exports a bare handler, expected a table"
                )))
            }
            Export::Init(_) => {
                return Err(BlackskyError::Command(format!(
                    "module '{module_name}' exports only an initializer"
                )))
            }
            Export::Value(v) => {
                return Err(BlackskyError::Command(format!(
                    "module '{module_name}' exports a plain value: {v}"
                )))
            }
        };

        let mut commands = Vec::new();
        match table.get("commands") {
            Some(Export::Table(nested)) => flatten(nested, &mut commands),
            _ => {
                for (name, export) in table.iter() {
                    if let Export::Handler(h) = export {
                        commands.push((name.to_string(), h.clone()));
                    }
                }
            }
        }

        let category = match table.get("category") {
            Some(Export::Value(serde_json::Value::String(c))) if !c.trim().is_empty() => {
                c.trim().to_string()
            }
            _ => module_name.to_string(),
        };

        let init = match table.get("init") {
            Some(Export::Init(init)) => Some(init.clone()),
            _ => None,
        };

        Ok(NormalizedModule {
            name: module_name.to_string(),
            commands,
            category,
            init,
        })
    }
}

fn flatten(table: &ExportTable, out: &mut Vec<(String, Arc<dyn CommandHandler>)>) {
    for (name, export) in table.iter() {
        match export {
            Export::Handler(h) => out.push((name.to_string(), h.clone())),
            Export::Table(inner) => flatten(inner, out),
            Export::Init(_) | Export::Value(_) => {}
        }
    }
}
