//! Plugins compiled into the launcher.

use std::sync::Arc;

use trove_core::{Plugin, StaticPluginLoader};
use trove_storage_memory::{MemoryStoragePlugin, PLUGIN_NAME as MEMORY_STORAGE};

/// Prefix accepted in front of built-in source names.
const BUILTIN_PREFIX: &str = "builtin:";

/// Loader resolving the built-in plugin sources.
///
/// Each load creates a fresh plugin instance, so data does not survive a
/// shutdown and re-initialize cycle.
pub fn loader() -> StaticPluginLoader {
    let mut loader = StaticPluginLoader::new();
    for source in [
        MEMORY_STORAGE.to_string(),
        format!("{BUILTIN_PREFIX}{MEMORY_STORAGE}"),
    ] {
        loader.register(source, || {
            Ok(Arc::new(MemoryStoragePlugin::new()) as Arc<dyn Plugin>)
        });
    }
    loader
}
