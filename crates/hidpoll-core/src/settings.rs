// Hidpoll Settings Module
// User-configurable queue sizing, plugin selection and poll cadence

#![cfg(feature = "toml-config")]

use std::path::{Path, PathBuf};

use crate::environment::PluginSelection;
use crate::event::queue_config;

/// Environment variable listing extra plugin names
pub const PLUGINS_ENV: &str = "HIDPOLL_PLUGINS";

/// Environment variable that can switch off the platform default plugins
pub const USE_DEFAULT_PLUGIN_ENV: &str = "HIDPOLL_USE_DEFAULT_PLUGIN";

const DEFAULT_POLL_INTERVAL_MS: u64 = 16;

/// Settings for hidpoll
///
/// Loaded from a TOML file (default: ~/.config/hidpoll/settings.toml) and
/// optionally overridden from the process environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Event queue capacity for newly constructed controllers
    queue_capacity: usize,

    /// Include the platform's default plugins
    use_default_plugins: bool,

    /// Additional plugin names, in priority order
    extra_plugins: Vec<String>,

    /// Poll cadence used by the CLI
    poll_interval_ms: u64,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default)]
    queue: Option<QueueSettings>,

    #[serde(default)]
    plugins: Option<PluginSettings>,

    #[serde(default)]
    poll: Option<PollSettings>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct QueueSettings {
    #[serde(default)]
    capacity: Option<i64>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct PluginSettings {
    #[serde(default)]
    use_default: Option<toml::Value>,

    #[serde(default)]
    extra: Option<Vec<String>>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct PollSettings {
    #[serde(default)]
    interval_ms: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create settings with every value at its default
    pub fn new() -> Self {
        Self {
            queue_capacity: queue_config::DEFAULT_CAPACITY,
            use_default_plugins: true,
            extra_plugins: Vec::new(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(capacity) = toml_settings.queue.and_then(|q| q.capacity) {
            settings.queue_capacity = usize::try_from(capacity).map_err(|_| {
                SettingsError::InvalidValue(format!("queue capacity {} is negative", capacity))
            })?;
        }

        if let Some(plugins) = toml_settings.plugins {
            if let Some(value) = plugins.use_default {
                settings.use_default_plugins = parse_bool_value(&value)?;
            }
            if let Some(extra) = plugins.extra {
                for name in extra {
                    settings.add_plugin(&name);
                }
            }
        }

        if let Some(interval) = toml_settings.poll.and_then(|p| p.interval_ms) {
            settings.poll_interval_ms = u64::try_from(interval).map_err(|_| {
                SettingsError::InvalidValue(format!("poll interval {} is negative", interval))
            })?;
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hidpoll").join("settings.toml"))
    }

    /// Load from default location (~/.config/hidpoll/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    /// Apply `HIDPOLL_PLUGINS` and `HIDPOLL_USE_DEFAULT_PLUGIN` from the
    /// process environment
    pub fn apply_env(&mut self) -> Result<(), SettingsError> {
        self.apply_overrides(
            std::env::var(PLUGINS_ENV).ok().as_deref(),
            std::env::var(USE_DEFAULT_PLUGIN_ENV).ok().as_deref(),
        )
    }

    /// Apply override values as they would come from the environment
    pub fn apply_overrides(
        &mut self,
        plugins: Option<&str>,
        use_default: Option<&str>,
    ) -> Result<(), SettingsError> {
        if let Some(list) = plugins {
            for name in list.split(|c: char| c.is_whitespace() || ",;:".contains(c)) {
                self.add_plugin(name);
            }
        }
        if let Some(flag) = use_default {
            self.use_default_plugins = parse_bool_str(flag)?;
        }
        Ok(())
    }

    fn add_plugin(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.extra_plugins.iter().any(|p| p == name) {
            self.extra_plugins.push(name.to_string());
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn set_queue_capacity(&mut self, capacity: usize) {
        self.queue_capacity = capacity;
    }

    pub fn use_default_plugins(&self) -> bool {
        self.use_default_plugins
    }

    pub fn extra_plugins(&self) -> &[String] {
        &self.extra_plugins
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    /// Plugin selection an environment should be built with
    pub fn plugin_selection(&self) -> PluginSelection {
        PluginSelection {
            use_default: self.use_default_plugins,
            extra: self.extra_plugins.clone(),
            queue_capacity: self.queue_capacity,
        }
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            let new_settings = Self::from_file(path)?;
            *self = new_settings;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }
}

/// Parse a TOML value as a boolean
fn parse_bool_value(value: &toml::Value) -> Result<bool, SettingsError> {
    match value {
        toml::Value::Boolean(b) => Ok(*b),
        toml::Value::Integer(1) => Ok(true),
        toml::Value::Integer(0) => Ok(false),
        toml::Value::String(s) => parse_bool_str(s),
        _ => Err(SettingsError::InvalidValue(format!(
            "Cannot convert {:?} to boolean",
            value
        ))),
    }
}

fn parse_bool_str(s: &str) -> Result<bool, SettingsError> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(SettingsError::InvalidValue(format!(
            "Cannot convert '{}' to boolean",
            s
        ))),
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Hidpoll Settings
# Place this file at: ~/.config/hidpoll/settings.toml

[queue]
# Event queue capacity for new controllers
capacity = 32

[plugins]
# Include the platform's default plugins
use_default = true
# Additional plugins, scanned first and in this order
# extra = ["replay"]

[poll]
# Poll cadence in milliseconds
interval_ms = 16
"#
}
