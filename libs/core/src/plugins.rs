//! Plugin registry and lifecycle.
//!
//! A plugin is a named, versioned unit that may bind hooks and may implement
//! one or more storage roles. The registry keeps at most one plugin per name.
//!
//! Loading registers the plugin, then its hooks, then runs `initialize`. If
//! `initialize` fails the plugin is unloaded again before the error is
//! returned, so a half-initialized plugin is never visible.
//!
//! Loads and unloads are serialized: a plugin's hooks are bound exactly while
//! it is registered, even when a name is reused during another plugin's
//! `shutdown`. `initialize` and `shutdown` must not load or unload plugins on
//! the same system.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::hooks::{HookHandler, HookSystem};
use crate::loader::PluginLoader;
use crate::storage::{EventStorage, FileStorage, LinkStorage};
use crate::Trove;

// =============================================================================
// Capabilities
// =============================================================================

/// Storage role a plugin declares it can fulfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "storage:events")]
    EventStorage,
    #[serde(rename = "storage:files")]
    FileStorage,
    #[serde(rename = "storage:links")]
    LinkStorage,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::EventStorage => "storage:events",
            Capability::FileStorage => "storage:files",
            Capability::LinkStorage => "storage:links",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Plugin
// =============================================================================

/// A hook binding declared by a plugin.
#[derive(Clone)]
pub struct HookRegistration {
    pub hook: String,
    pub priority: i32,
    pub handler: Arc<dyn HookHandler>,
}

impl HookRegistration {
    pub fn new(hook: impl Into<String>, handler: Arc<dyn HookHandler>) -> Self {
        Self {
            hook: hook.into(),
            priority: 0,
            handler,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// An extension unit.
///
/// Every method except `name` and `version` has a default, so a plugin only
/// implements the parts it provides. A plugin that lists a storage capability
/// must also return the matching role from its accessor, otherwise storage
/// resolution rejects it.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn capabilities(&self) -> &[Capability] {
        &[]
    }

    /// Hook bindings registered when the plugin is loaded.
    fn hooks(&self) -> Vec<HookRegistration> {
        Vec::new()
    }

    /// Called once after registration. A failure unloads the plugin.
    async fn initialize(&self, _core: &Trove) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once on unload. Failures are logged and ignored.
    async fn shutdown(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn event_storage(&self) -> Option<Arc<dyn EventStorage>> {
        None
    }

    fn file_storage(&self) -> Option<Arc<dyn FileStorage>> {
        None
    }

    fn link_storage(&self) -> Option<Arc<dyn LinkStorage>> {
        None
    }
}

/// Serializable summary of a loaded plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub capabilities: Vec<Capability>,
}

impl PluginInfo {
    pub fn of(plugin: &dyn Plugin) -> Self {
        Self {
            name: plugin.name().to_string(),
            version: plugin.version().to_string(),
            capabilities: plugin.capabilities().to_vec(),
        }
    }
}

/// Returns true if the plugin declares every capability in `required`.
pub fn has_capabilities(plugin: &dyn Plugin, required: &[Capability]) -> bool {
    let declared = plugin.capabilities();
    required.iter().all(|c| declared.contains(c))
}

// =============================================================================
// Plugin System
// =============================================================================

/// Registry of loaded plugins.
pub struct PluginSystem {
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    hooks: Arc<HookSystem>,
    lifecycle: Mutex<()>,
}

impl PluginSystem {
    pub fn new(hooks: Arc<HookSystem>) -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
            hooks,
            lifecycle: Mutex::new(()),
        }
    }

    pub fn hooks(&self) -> &Arc<HookSystem> {
        &self.hooks
    }

    /// Registers a plugin, binds its hooks and initializes it.
    pub async fn load_plugin(&self, plugin: Arc<dyn Plugin>, core: &Trove) -> Result<(), CoreError> {
        let name = plugin.name().to_string();
        let _lifecycle = self.lifecycle.lock().await;

        {
            let mut plugins = self.plugins.write().await;
            if plugins.iter().any(|p| p.name() == name) {
                warn!(plugin = %name, "Plugin is already registered");
                return Err(CoreError::DuplicatePlugin(name));
            }
            plugins.push(plugin.clone());
        }

        for registration in plugin.hooks() {
            self.hooks
                .register_hook(
                    name.clone(),
                    registration.hook,
                    registration.handler,
                    registration.priority,
                )
                .await;
        }

        if let Err(e) = plugin.initialize(core).await {
            error!(plugin = %name, error = %e, "Failed to initialize plugin");
            self.remove(&name).await;
            return Err(CoreError::PluginInitializationFailed {
                plugin: name,
                source: e,
            });
        }

        info!(plugin = %name, version = plugin.version(), "Loaded plugin");
        Ok(())
    }

    /// Removes a plugin and its hooks, running its `shutdown` once.
    ///
    /// Unknown names are ignored. Shutdown errors are logged, never returned.
    pub async fn unload_plugin(&self, name: &str) {
        let _lifecycle = self.lifecycle.lock().await;
        self.remove(name).await;
    }

    /// Unload steps; the caller holds the lifecycle lock.
    async fn remove(&self, name: &str) {
        let removed = {
            let mut plugins = self.plugins.write().await;
            plugins
                .iter()
                .position(|p| p.name() == name)
                .map(|index| plugins.remove(index))
        };

        let Some(plugin) = removed else {
            debug!(plugin = name, "Unload requested for unknown plugin");
            return;
        };

        if let Err(e) = plugin.shutdown().await {
            error!(plugin = name, error = %e, "Error shutting down plugin");
        }

        self.hooks.unregister_plugin(name).await;
        info!(plugin = name, "Unloaded plugin");
    }

    /// Hands `sources` to the loader, which calls back into [`Self::load_plugin`].
    pub async fn load_plugins(
        &self,
        sources: &[String],
        loader: &dyn PluginLoader,
        core: &Trove,
    ) -> Result<(), CoreError> {
        if sources.is_empty() {
            return Ok(());
        }

        loader
            .load_plugins(sources, self, core)
            .await
            .map_err(|e| {
                error!(error = %e, "Plugin loader failed");
                CoreError::PluginLoadFailed(e)
            })
    }

    /// Looks up a plugin by name, requiring every listed capability.
    pub async fn get_plugin(&self, name: &str, required: &[Capability]) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .read()
            .await
            .iter()
            .find(|p| p.name() == name)
            .filter(|p| has_capabilities(p.as_ref(), required))
            .cloned()
    }

    /// Snapshot of the registry in load order.
    pub async fn get_all_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.read().await.clone()
    }

    pub async fn plugin_infos(&self) -> Vec<PluginInfo> {
        self.plugins
            .read()
            .await
            .iter()
            .map(|p| PluginInfo::of(p.as_ref()))
            .collect()
    }
}
