//! Plugin discovery.
//!
//! The core never loads code dynamically. A [`PluginLoader`] turns source
//! identifiers into plugin instances and registers each through
//! [`PluginSystem::load_plugin`]. [`StaticPluginLoader`] resolves identifiers
//! against factories compiled into the host binary.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::plugins::{Plugin, PluginSystem};
use crate::Trove;

/// Produces plugin instances for configured sources.
///
/// Implementations skip sources they cannot handle; an `Err` means the loader
/// as a whole is unusable.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    async fn load_plugins(
        &self,
        sources: &[String],
        plugins: &PluginSystem,
        core: &Trove,
    ) -> anyhow::Result<()>;
}

type PluginFactory = Box<dyn Fn() -> anyhow::Result<Arc<dyn Plugin>> + Send + Sync>;

/// Loader backed by an in-process table of plugin factories.
#[derive(Default)]
pub struct StaticPluginLoader {
    factories: HashMap<String, PluginFactory>,
}

impl StaticPluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `source` to a factory invoked once per load.
    pub fn register<F>(&mut self, source: impl Into<String>, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        self.factories.insert(source.into(), Box::new(factory));
    }

    /// Maps `source` to an existing plugin instance.
    #[must_use]
    pub fn with_plugin(mut self, source: impl Into<String>, plugin: Arc<dyn Plugin>) -> Self {
        self.register(source, move || Ok(plugin.clone()));
        self
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[async_trait]
impl PluginLoader for StaticPluginLoader {
    async fn load_plugins(
        &self,
        sources: &[String],
        plugins: &PluginSystem,
        core: &Trove,
    ) -> anyhow::Result<()> {
        for source in sources {
            let Some(factory) = self.factories.get(source) else {
                warn!(source = %source, "Unknown plugin source, skipping");
                continue;
            };

            let plugin = match factory() {
                Ok(plugin) => plugin,
                Err(e) => {
                    error!(source = %source, error = %e, "Failed to create plugin");
                    continue;
                }
            };

            if plugin.name().is_empty() || plugin.version().is_empty() {
                warn!(source = %source, "Invalid plugin structure, skipping");
                continue;
            }

            // `load_plugin` has already logged the failure.
            if let Err(e) = plugins.load_plugin(plugin, core).await {
                debug!(source = %source, error = %e, "Skipping plugin source");
            }
        }

        Ok(())
    }
}
