//! Declarative per-command settings loaded from JSON category files.
//!
//! Each `{dir}/*.json` file holds an array of records:
//!
//! ```json
//! [{ "name": "ping", "cooldown": 5, "groupOnly": false,
//!    "permissions": ["admin"], "description": "...", "usage": "...", "enabled": true }]
//! ```

use crate::entry::Role;
use blacksky_core::error::BlackskyError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

/// One record as written in a category file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub name: String,
    #[serde(default)]
    pub cooldown: Option<u64>,
    #[serde(default)]
    pub group_only: Option<bool>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Settings that override a command's defaults. `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOverrides {
    pub cooldown_secs: Option<u64>,
    pub required_role: Option<Role>,
    pub group_only: Option<bool>,
    pub enabled: Option<bool>,
    pub description: Option<String>,
    pub usage: Option<String>,
}

impl From<CommandRecord> for CommandOverrides {
    fn from(r: CommandRecord) -> Self {
        let required_role = if r.permissions.is_empty() {
            None
        } else {
            Some(Role::from_permissions(&r.permissions))
        };
        Self {
            cooldown_secs: r.cooldown,
            required_role,
            group_only: r.group_only,
            enabled: r.enabled,
            description: r.description,
            usage: r.usage,
        }
    }
}

/// Parse one category file: a JSON array of [`CommandRecord`]s.
pub fn parse_records(content: &str) -> Result<Vec<CommandRecord>, BlackskyError> {
    Ok(serde_json::from_str(content)?)
}

/// Lookup of declarative overrides by command name.
pub trait CommandConfigSource: Send + Sync {
    fn get(&self, name: &str) -> Option<CommandOverrides>;

    /// Re-read the backing data before a registry rebuild.
    fn refresh(&self) {}
}

/// JSON-backed [`CommandConfigSource`].
#[derive(Default)]
pub struct CommandCatalog {
    dir: Option<PathBuf>,
    records: RwLock<HashMap<String, CommandOverrides>>,
}

impl CommandCatalog {
    /// A catalog with no overrides.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from in-memory records (later records win).
    pub fn from_records(records: impl IntoIterator<Item = CommandRecord>) -> Self {
        Self {
            dir: None,
            records: RwLock::new(index(records)),
        }
    }

    /// Load every `*.json` file in `dir`. Unreadable or malformed files are
    /// skipped with a warning.
    pub fn load_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let records = read_dir_records(&dir);
        Self {
            dir: Some(dir),
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CommandConfigSource for CommandCatalog {
    fn get(&self, name: &str) -> Option<CommandOverrides> {
        let records = self.records.read().ok()?;
        records.get(&name.to_lowercase()).cloned()
    }

    fn refresh(&self) {
        let Some(ref dir) = self.dir else {
            return;
        };
        let fresh = read_dir_records(dir);
        if let Ok(mut records) = self.records.write() {
            *records = fresh;
        }
    }
}

fn index(records: impl IntoIterator<Item = CommandRecord>) -> HashMap<String, CommandOverrides> {
    let mut map = HashMap::new();
    for record in records {
        let key = record.name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        map.insert(key, CommandOverrides::from(record));
    }
    map
}

fn read_dir_records(dir: &Path) -> HashMap<String, CommandOverrides> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("catalog: cannot read {}: {e}", dir.display());
            return HashMap::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    // Deterministic precedence across files.
    files.sort();

    let mut all = Vec::new();
    for path in files {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("catalog: failed to read {}: {e}", path.display());
                continue;
            }
        };
        match parse_records(&content) {
            Ok(records) => all.extend(records),
            Err(e) => warn!("catalog: skipping malformed {}: {e}", path.display()),
        }
    }

    let map = index(all);
    let count = map.len();
    info!("catalog: {count} command records from {}", dir.display());
    map
}

/// Deploy bundled category files to `dir`, creating it if needed.
///
/// Never overwrites existing files so user edits are preserved.
pub fn install_bundled_catalog(dir: &Path, files: &[(&str, &str)]) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("catalog: failed to create {}: {e}", dir.display());
        return;
    }
    for (name, content) in files {
        let dest = dir.join(name);
        if dest.exists() {
            continue;
        }
        if let Err(e) = std::fs::write(&dest, content) {
            warn!("catalog: failed to write {}: {e}", dest.display());
        } else {
            info!("catalog: installed bundled {name}");
        }
    }
}
