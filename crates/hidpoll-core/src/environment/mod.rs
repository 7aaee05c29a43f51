// Hidpoll Environment
// Ordered plugin registry and the one-time controller scan built on it

mod platform;

pub use platform::{OsFamily, Platform};

use crate::backend::BackendResult;
use crate::controller::{Controller, SharedController};
use crate::event::queue_config;

/// What a plugin constructor gets to work with
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub platform: Platform,
    /// Event queue capacity new controllers should start with
    pub queue_capacity: usize,
}

/// Builds the controllers a plugin can see
pub type PluginConstructor =
    Box<dyn Fn(&PluginContext) -> BackendResult<Vec<Controller>> + Send + Sync>;

/// One source of controllers, such as a native input subsystem
pub struct Plugin {
    name: String,
    default: bool,
    supported: fn(&Platform) -> bool,
    construct: PluginConstructor,
}

impl Plugin {
    pub fn new(
        name: impl Into<String>,
        supported: fn(&Platform) -> bool,
        construct: impl Fn(&PluginContext) -> BackendResult<Vec<Controller>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            default: false,
            supported,
            construct: Box::new(construct),
        }
    }

    /// Mark this plugin as one of the platform defaults
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn is_supported(&self, platform: &Platform) -> bool {
        (self.supported)(platform)
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// Predicate for plugins that run everywhere
pub fn any_platform(_platform: &Platform) -> bool {
    true
}

/// Plugins in registration order, built once at program start
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin; a later plugin with the same name is ignored
    pub fn register(&mut self, plugin: Plugin) -> &mut Self {
        if self.get(plugin.name()).is_some() {
            log::warn!("Plugin {} already registered, ignoring duplicate", plugin.name());
        } else {
            self.plugins.push(plugin);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }
}

/// Which registered plugins an environment runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSelection {
    /// Include the registry's default plugins
    pub use_default: bool,
    /// Additional plugin names, scanned first and in this order
    pub extra: Vec<String>,
    pub queue_capacity: usize,
}

impl Default for PluginSelection {
    fn default() -> Self {
        Self {
            use_default: true,
            extra: Vec::new(),
            queue_capacity: queue_config::DEFAULT_CAPACITY,
        }
    }
}

impl PluginSelection {
    /// Plugin names to scan, in order, without duplicates
    pub fn resolve(&self, registry: &PluginRegistry) -> Vec<String> {
        let defaults = registry
            .iter()
            .filter(|p| self.use_default && p.is_default())
            .map(|p| p.name().to_string());
        let mut names: Vec<String> = Vec::new();
        for name in self.extra.iter().cloned().chain(defaults) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// The set of controllers visible to the application.
///
/// Controllers are discovered once, on first request, by running each
/// selected plugin that supports the current platform.
#[derive(Debug)]
pub struct Environment {
    platform: Platform,
    registry: PluginRegistry,
    selection: PluginSelection,
    loaded: Vec<String>,
    controllers: Option<Vec<SharedController>>,
}

impl Environment {
    pub fn new(registry: PluginRegistry, selection: PluginSelection) -> Self {
        Self::with_platform(Platform::detect(), registry, selection)
    }

    pub fn with_platform(
        platform: Platform,
        registry: PluginRegistry,
        selection: PluginSelection,
    ) -> Self {
        Self {
            platform,
            registry,
            selection,
            loaded: Vec::new(),
            controllers: None,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Controllers from every loaded plugin, scanning on first call
    pub fn controllers(&mut self) -> &[SharedController] {
        if self.controllers.is_none() {
            let scanned = self.scan();
            self.controllers = Some(scanned);
        }
        self.controllers.as_deref().unwrap_or_default()
    }

    /// Names of plugins that produced controllers, in scan order
    pub fn loaded_plugins(&self) -> &[String] {
        &self.loaded
    }

    fn scan(&mut self) -> Vec<SharedController> {
        let context = PluginContext {
            platform: self.platform.clone(),
            queue_capacity: self.selection.queue_capacity,
        };
        let mut controllers = Vec::new();

        for name in self.selection.resolve(&self.registry) {
            if self.loaded.contains(&name) {
                continue;
            }
            let Some(plugin) = self.registry.get(&name) else {
                log::warn!("Plugin {} is not registered", name);
                continue;
            };
            if !plugin.is_supported(&self.platform) {
                log::info!("Plugin {} is not supported on {}", name, self.platform);
                continue;
            }
            log::debug!("Loading plugin {}", name);
            match (plugin.construct)(&context) {
                Ok(found) => {
                    log::info!("Plugin {} found {} controller(s)", name, found.len());
                    controllers.extend(found.into_iter().map(SharedController::new));
                    self.loaded.push(name);
                }
                Err(e) => log::warn!("Plugin {} failed to enumerate controllers: {}", name, e),
            }
        }
        controllers
    }
}
