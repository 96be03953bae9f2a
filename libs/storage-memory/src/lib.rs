//! In-memory storage plugin.
//!
//! `memory-storage` fulfills all three storage roles with process-local maps.
//! Nothing survives a restart and concurrent saves to the same id are
//! last-write-wins. Intended for tests, demos and the default CLI setup.

mod events;
mod files;
mod links;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use trove_core::{Capability, EventStorage, FileStorage, LinkStorage, Plugin, Trove};

pub use events::MemoryEventStorage;
pub use files::MemoryFileStorage;
pub use links::MemoryLinkStorage;

/// Registry name of the plugin.
pub const PLUGIN_NAME: &str = "memory-storage";

const CAPABILITIES: &[Capability] = &[
    Capability::EventStorage,
    Capability::FileStorage,
    Capability::LinkStorage,
];

/// Plugin composing the three in-memory stores.
#[derive(Default)]
pub struct MemoryStoragePlugin {
    events: Arc<MemoryEventStorage>,
    files: Arc<MemoryFileStorage>,
    links: Arc<MemoryLinkStorage>,
}

impl MemoryStoragePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &MemoryEventStorage {
        &self.events
    }

    pub fn files(&self) -> &MemoryFileStorage {
        &self.files
    }

    pub fn links(&self) -> &MemoryLinkStorage {
        &self.links
    }
}

#[async_trait]
impl Plugin for MemoryStoragePlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    async fn initialize(&self, _core: &Trove) -> anyhow::Result<()> {
        debug!(plugin = PLUGIN_NAME, "Memory storage attached");
        Ok(())
    }

    fn event_storage(&self) -> Option<Arc<dyn EventStorage>> {
        Some(self.events.clone())
    }

    fn file_storage(&self) -> Option<Arc<dyn FileStorage>> {
        Some(self.files.clone())
    }

    fn link_storage(&self) -> Option<Arc<dyn LinkStorage>> {
        Some(self.links.clone())
    }
}
