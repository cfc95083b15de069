//! The command registry: a copy-on-write map from command name to entry.

use crate::builtin::{self, Builtin};
use crate::catalog::CommandConfigSource;
use crate::entry::{CommandHandler, HandlerEntry, Role};
use crate::module::{CommandModule, ModuleAdapter};
use arc_swap::ArcSwap;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Registry-wide defaults.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Command prefix, used in help output.
    pub prefix: String,
    /// Cooldown for entries without a configured one.
    pub default_cooldown_secs: u64,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            prefix: ".".to_string(),
            default_cooldown_secs: 3,
        }
    }
}

/// An immutable, fully built view of the registry.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    entries: HashMap<String, Arc<HandlerEntry>>,
}

impl RegistrySnapshot {
    pub fn get(&self, name: &str) -> Option<Arc<HandlerEntry>> {
        self.entries.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries sorted by name.
    pub fn entries(&self) -> Vec<Arc<HandlerEntry>> {
        let mut all: Vec<_> = self.entries.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Entries grouped by category, both levels sorted.
    pub fn categories(&self) -> BTreeMap<String, Vec<Arc<HandlerEntry>>> {
        let mut map: BTreeMap<String, Vec<Arc<HandlerEntry>>> = BTreeMap::new();
        for entry in self.entries() {
            map.entry(entry.category.clone()).or_default().push(entry);
        }
        map
    }
}

/// A command name registered twice; the later module won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub name: String,
    pub previous_module: String,
    pub module: String,
}

/// Outcome of a registry build.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Modules that exported and normalized successfully.
    pub modules_loaded: usize,
    /// Entries in the resulting registry, built-ins included.
    pub commands: usize,
    /// `(module, error)` for modules that failed to export or normalize.
    pub failed: Vec<(String, String)>,
    /// `(module, name)` for command names that cannot be dispatched.
    pub skipped: Vec<(String, String)>,
    pub collisions: Vec<Collision>,
    /// Initializer outcome per module that exposes one.
    pub init_results: BTreeMap<String, bool>,
}

impl LoadReport {
    pub fn summary(&self) -> String {
        let init_failed = self.init_results.values().filter(|ok| !**ok).count();
        format!(
            "{} commands from {} modules ({} failed, {} collisions, {} init failures)",
            self.commands,
            self.modules_loaded,
            self.failed.len(),
            self.collisions.len(),
            init_failed
        )
    }
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub commands: usize,
    pub modules: usize,
    pub lookups: u64,
    pub loads: u64,
}

/// Flat registry of commands built from independent modules.
///
/// Readers always see a complete map: every build produces a new
/// [`RegistrySnapshot`] that replaces the previous one in a single swap.
pub struct CommandRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
    config: Arc<dyn CommandConfigSource>,
    options: RegistryOptions,
    builtins: Vec<Builtin>,
    modules: Mutex<Vec<Arc<dyn CommandModule>>>,
    /// Serializes builds so two reloads never interleave.
    build_lock: tokio::sync::Mutex<()>,
    lookups: AtomicU64,
    loads: AtomicU64,
}

impl CommandRegistry {
    /// Create a registry holding only the built-in commands.
    pub fn new(config: Arc<dyn CommandConfigSource>, options: RegistryOptions) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let builtins = builtin::builtins(weak.clone());
            let mut entries = HashMap::new();
            for b in &builtins {
                let entry = b.entry(config.as_ref(), &options);
                entries.insert(entry.name.clone(), Arc::new(entry));
            }
            Self {
                snapshot: ArcSwap::from_pointee(RegistrySnapshot { entries }),
                config,
                options,
                builtins,
                modules: Mutex::new(Vec::new()),
                build_lock: tokio::sync::Mutex::new(()),
                lookups: AtomicU64::new(0),
                loads: AtomicU64::new(0),
            }
        })
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Build the registry from `modules`, remembering them for [`reload`](Self::reload).
    pub async fn load(&self, modules: Vec<Arc<dyn CommandModule>>) -> LoadReport {
        let _guard = self.build_lock.lock().await;
        if let Ok(mut current) = self.modules.lock() {
            *current = modules.clone();
        }
        self.build(&modules).await
    }

    /// Rebuild from the last loaded modules after refreshing declarative config.
    pub async fn reload(&self) -> LoadReport {
        let _guard = self.build_lock.lock().await;
        self.config.refresh();
        let modules = self
            .modules
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default();
        self.build(&modules).await
    }

    /// Case-insensitive lookup in the current snapshot.
    pub fn get(&self, name: &str) -> Option<Arc<HandlerEntry>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.snapshot.load().get(&name.to_lowercase())
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            commands: self.snapshot.load().len(),
            modules: self.modules.lock().map(|m| m.len()).unwrap_or(0),
            lookups: self.lookups.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
        }
    }

    async fn build(&self, modules: &[Arc<dyn CommandModule>]) -> LoadReport {
        let mut report = LoadReport::default();
        let mut entries: HashMap<String, Arc<HandlerEntry>> = HashMap::new();
        let mut inits = Vec::new();

        for module in modules {
            let module_name = module.name().to_string();
            let normalized = match module
                .export()
                .map_err(|e| e.to_string())
                .and_then(|raw| {
                    ModuleAdapter::normalize(raw, &module_name).map_err(|e| e.to_string())
                }) {
                Ok(n) => n,
                Err(e) => {
                    warn!("registry: module '{module_name}' failed to load: {e}");
                    report.failed.push((module_name, e));
                    continue;
                }
            };

            for (raw_name, handler) in normalized.commands {
                let name = raw_name.trim().to_lowercase();
                if name.is_empty() || name.chars().any(char::is_whitespace) {
                    warn!("registry: skipping undispatchable name {raw_name:?} in '{module_name}'");
                    report.skipped.push((module_name.clone(), raw_name));
                    continue;
                }
                let entry = build_entry(
                    self.config.as_ref(),
                    &self.options,
                    &name,
                    handler,
                    &normalized.category,
                    &module_name,
                    Role::User,
                );
                if let Some(previous) = entries.insert(name.clone(), Arc::new(entry)) {
                    warn!(
                        "registry: command '{name}' from '{}' overridden by '{module_name}'",
                        previous.module
                    );
                    report.collisions.push(Collision {
                        name,
                        previous_module: previous.module.clone(),
                        module: module_name.clone(),
                    });
                }
            }

            if let Some(init) = normalized.init {
                inits.push((module_name.clone(), init));
            }
            report.modules_loaded += 1;
        }

        for b in &self.builtins {
            let entry = b.entry(self.config.as_ref(), &self.options);
            if let Some(previous) = entries.insert(entry.name.clone(), Arc::new(entry)) {
                warn!(
                    "registry: built-in '{}' shadows command from '{}'",
                    b.name, previous.module
                );
                report.collisions.push(Collision {
                    name: b.name.to_string(),
                    previous_module: previous.module.clone(),
                    module: builtin::MODULE.to_string(),
                });
            }
        }

        report.commands = entries.len();
        self.snapshot.store(Arc::new(RegistrySnapshot { entries }));
        self.loads.fetch_add(1, Ordering::Relaxed);

        // Commands stay registered whatever their module's init reports.
        for (module_name, init) in inits {
            let outcome = tokio::spawn(async move { init.init().await }).await;
            let ok = match outcome {
                Ok(Ok(ok)) => ok,
                Ok(Err(e)) => {
                    warn!("registry: init of '{module_name}' failed: {e}");
                    false
                }
                Err(e) => {
                    warn!("registry: init of '{module_name}' panicked: {e}");
                    false
                }
            };
            debug!("registry: init '{module_name}' -> {ok}");
            report.init_results.insert(module_name, ok);
        }

        info!("registry: {}", report.summary());
        report
    }
}

/// Merge declarative overrides into a fresh entry.
pub(crate) fn build_entry(
    config: &dyn CommandConfigSource,
    options: &RegistryOptions,
    name: &str,
    handler: Arc<dyn CommandHandler>,
    category: &str,
    module: &str,
    base_role: Role,
) -> HandlerEntry {
    let overrides = config.get(name).unwrap_or_default();
    HandlerEntry {
        name: name.to_string(),
        handler,
        cooldown_secs: overrides
            .cooldown_secs
            .unwrap_or(options.default_cooldown_secs),
        required_role: overrides.required_role.unwrap_or(base_role),
        group_only: overrides.group_only.unwrap_or(false),
        category: category.to_string(),
        enabled: overrides.enabled.unwrap_or(true),
        description: overrides.description,
        usage: overrides.usage,
        module: module.to_string(),
    }
}
