//! Core configuration.
//!
//! The core does not read files or environment variables itself; a config
//! supplier (the `trove` CLI, an embedding application, a test) builds a
//! [`CoreConfig`] and hands it to [`crate::Trove`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level configuration of a trove instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub plugins: PluginsConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Plugin sources handed to the plugin loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Source identifiers, interpreted by the configured loader.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Free-form per-plugin settings, keyed by plugin name.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

/// Storage role assignments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Required; initialization fails without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<StoragePluginConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<StoragePluginConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<LinkStorageConfig>,
}

/// A plugin name plus the options passed to its role `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoragePluginConfig {
    pub plugin: String,

    #[serde(default)]
    pub options: Value,
}

impl StoragePluginConfig {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }
}

/// Wire value selecting "links live with the events".
pub const USE_EVENT_STORAGE: &str = "use-event-storage";

/// Where event links are persisted.
///
/// Serialized either as a `{ plugin, options }` table or as the string
/// `"use-event-storage"` (`"useEventStorage"` is accepted on input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinkStorageRepr", into = "LinkStorageRepr")]
pub enum LinkStorageConfig {
    /// Links are stored inside the event record by the event backend.
    UseEventStorage,

    /// Links are persisted by a dedicated link storage plugin.
    Plugin(StoragePluginConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum LinkStorageRepr {
    Sentinel(String),
    Plugin(StoragePluginConfig),
}

impl TryFrom<LinkStorageRepr> for LinkStorageConfig {
    type Error = String;

    fn try_from(repr: LinkStorageRepr) -> Result<Self, Self::Error> {
        match repr {
            LinkStorageRepr::Sentinel(s) if s == USE_EVENT_STORAGE || s == "useEventStorage" => {
                Ok(LinkStorageConfig::UseEventStorage)
            }
            LinkStorageRepr::Sentinel(s) => Err(format!(
                "invalid link storage '{s}': expected a plugin table or \"{USE_EVENT_STORAGE}\""
            )),
            LinkStorageRepr::Plugin(config) => Ok(LinkStorageConfig::Plugin(config)),
        }
    }
}

impl From<LinkStorageConfig> for LinkStorageRepr {
    fn from(config: LinkStorageConfig) -> Self {
        match config {
            LinkStorageConfig::UseEventStorage => {
                LinkStorageRepr::Sentinel(USE_EVENT_STORAGE.to_string())
            }
            LinkStorageConfig::Plugin(config) => LinkStorageRepr::Plugin(config),
        }
    }
}

impl CoreConfig {
    /// Configuration using one plugin for event storage and nothing else.
    pub fn with_event_storage(plugin: impl Into<String>) -> Self {
        Self {
            plugins: PluginsConfig::default(),
            storage: StorageConfig {
                events: Some(StoragePluginConfig::new(plugin)),
                files: None,
                links: None,
            },
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.plugins.sources.push(source.into());
        self
    }
}
