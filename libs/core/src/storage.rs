//! Storage roles and their delegation.
//!
//! Persistence is split into three roles, each fulfilled by a loaded plugin
//! that declares the matching capability:
//!
//! - `storage:events` (required): event records, reads and queries
//! - `storage:files` (optional): file content, saved before the event
//! - `storage:links` (optional): typed links, saved after the event and
//!   authoritative on reads
//!
//! The manager resolves the roles once per `initialize` and keeps no data of
//! its own. There is no transaction spanning several plugins: a failure
//! midway through a save leaves whatever the earlier calls persisted.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use trove_events::{Event, EventFile, EventId, EventLink, EventQuery, FileData};

use crate::config::{LinkStorageConfig, StorageConfig, StoragePluginConfig};
use crate::error::CoreError;
use crate::plugins::{Capability, Plugin, PluginSystem};

// =============================================================================
// Role interfaces
// =============================================================================

/// Persists event records.
#[async_trait]
pub trait EventStorage: Send + Sync {
    /// Receives the `options` value of the role's configuration.
    async fn initialize(&self, _options: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stores the event and returns the stored form.
    async fn save_event(&self, event: &Event) -> anyhow::Result<Event>;

    async fn get_event(&self, id: &EventId) -> anyhow::Result<Option<Event>>;

    async fn query_events(&self, query: &EventQuery) -> anyhow::Result<Vec<Event>>;
}

/// Persists file content.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn initialize(&self, _options: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stores the file and returns the id assigned to it.
    async fn save_file(&self, file: &EventFile) -> anyhow::Result<String>;

    async fn get_file(&self, id: &str) -> anyhow::Result<Option<EventFile>>;

    async fn get_file_data(&self, id: &str) -> anyhow::Result<FileData>;
}

/// Persists links between events.
#[async_trait]
pub trait LinkStorage: Send + Sync {
    async fn initialize(&self, _options: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    async fn save_link(&self, event_id: &EventId, link: &EventLink) -> anyhow::Result<()>;

    /// Links of `event_id`, optionally restricted to one link type.
    async fn get_links(
        &self,
        event_id: &EventId,
        link_type: Option<&str>,
    ) -> anyhow::Result<Vec<EventLink>>;
}

// =============================================================================
// Storage Manager
// =============================================================================

#[derive(Clone)]
struct StorageRoles {
    events: Arc<dyn EventStorage>,
    files: Option<Arc<dyn FileStorage>>,
    links: Option<Arc<dyn LinkStorage>>,
}

/// Resolves storage roles to plugins and coordinates multi-role writes.
pub struct StorageManager {
    plugins: Arc<PluginSystem>,
    roles: RwLock<Option<StorageRoles>>,
}

impl StorageManager {
    pub fn new(plugins: Arc<PluginSystem>) -> Self {
        Self {
            plugins,
            roles: RwLock::new(None),
        }
    }

    /// Resolves and initializes every configured role.
    ///
    /// Nothing is kept unless all roles resolve and initialize.
    pub async fn initialize(&self, config: &StorageConfig) -> Result<(), CoreError> {
        let Some(events_config) = &config.events else {
            error!("Event storage configuration is required");
            return Err(CoreError::MissingEventStorageConfig);
        };

        let events = self
            .resolve(events_config, Capability::EventStorage, |p| p.event_storage())
            .await?;
        events
            .initialize(&events_config.options)
            .await
            .map_err(storage_failure("initialize"))?;
        info!(plugin = %events_config.plugin, "Event storage ready");

        let files = match &config.files {
            Some(files_config) => {
                let files = self
                    .resolve(files_config, Capability::FileStorage, |p| p.file_storage())
                    .await?;
                files
                    .initialize(&files_config.options)
                    .await
                    .map_err(storage_failure("initialize"))?;
                info!(plugin = %files_config.plugin, "File storage ready");
                Some(files)
            }
            None => None,
        };

        let links = match &config.links {
            Some(LinkStorageConfig::Plugin(links_config)) => {
                let links = self
                    .resolve(links_config, Capability::LinkStorage, |p| p.link_storage())
                    .await?;
                links
                    .initialize(&links_config.options)
                    .await
                    .map_err(storage_failure("initialize"))?;
                info!(plugin = %links_config.plugin, "Link storage ready");
                Some(links)
            }
            Some(LinkStorageConfig::UseEventStorage) => {
                debug!("Links are stored with events");
                None
            }
            None => None,
        };

        *self.roles.write().await = Some(StorageRoles {
            events,
            files,
            links,
        });
        Ok(())
    }

    async fn resolve<R: ?Sized>(
        &self,
        config: &StoragePluginConfig,
        capability: Capability,
        role: impl Fn(&dyn Plugin) -> Option<Arc<R>>,
    ) -> Result<Arc<R>, CoreError> {
        let resolved = self
            .plugins
            .get_plugin(&config.plugin, &[capability])
            .await
            .and_then(|plugin| role(plugin.as_ref()));

        resolved.ok_or_else(|| {
            error!(
                plugin = %config.plugin,
                capability = %capability,
                "Storage plugin not found with required capability"
            );
            CoreError::PluginResolutionFailed {
                plugin: config.plugin.clone(),
                capabilities: vec![capability],
            }
        })
    }

    async fn roles(&self) -> Result<StorageRoles, CoreError> {
        self.roles
            .read()
            .await
            .clone()
            .ok_or(CoreError::NotInitialized)
    }

    /// Persists files, then the event, then its links.
    ///
    /// Ids assigned by the file storage are written back onto `event.files`
    /// before the event record is saved.
    pub async fn save_event(&self, event: &mut Event) -> Result<Event, CoreError> {
        let roles = self.roles().await?;

        if let Some(files) = &roles.files {
            for file in event.files.iter_mut().filter(|f| !f.is_persisted()) {
                file.id = files
                    .save_file(file)
                    .await
                    .map_err(storage_failure("save_file"))?;
                debug!(event_id = %event.id, file_id = %file.id, "Saved file");
            }
        }

        let saved = roles
            .events
            .save_event(event)
            .await
            .map_err(storage_failure("save_event"))?;

        if let Some(links) = &roles.links {
            for link in &event.links {
                links
                    .save_link(&event.id, link)
                    .await
                    .map_err(storage_failure("save_link"))?;
            }
        }

        Ok(saved)
    }

    /// Reads an event, taking its links from link storage when configured.
    pub async fn get_event(&self, id: &EventId) -> Result<Option<Event>, CoreError> {
        let roles = self.roles().await?;

        let Some(mut event) = roles
            .events
            .get_event(id)
            .await
            .map_err(storage_failure("get_event"))?
        else {
            return Ok(None);
        };

        if let Some(links) = &roles.links {
            event.links = links
                .get_links(id, None)
                .await
                .map_err(storage_failure("get_links"))?;
        }

        Ok(Some(event))
    }

    /// Passes the query to event storage unchanged.
    pub async fn query_events(&self, query: &EventQuery) -> Result<Vec<Event>, CoreError> {
        let roles = self.roles().await?;
        roles
            .events
            .query_events(query)
            .await
            .map_err(storage_failure("query_events"))
    }

    pub async fn get_file(&self, id: &str) -> Result<Option<EventFile>, CoreError> {
        let files = self.file_storage().await?;
        files.get_file(id).await.map_err(storage_failure("get_file"))
    }

    pub async fn get_file_data(&self, id: &str) -> Result<FileData, CoreError> {
        let files = self.file_storage().await?;
        files
            .get_file_data(id)
            .await
            .map_err(storage_failure("get_file_data"))
    }

    async fn file_storage(&self) -> Result<Arc<dyn FileStorage>, CoreError> {
        self.roles().await?.files.ok_or(CoreError::FileStorageUnavailable)
    }

    pub async fn is_initialized(&self) -> bool {
        self.roles.read().await.is_some()
    }

    /// Drops every resolved role.
    pub async fn reset(&self) {
        *self.roles.write().await = None;
    }
}

fn storage_failure(operation: &'static str) -> impl FnOnce(anyhow::Error) -> CoreError {
    move |source| {
        error!(operation, error = %source, "Storage operation failed");
        CoreError::StorageOperationFailed { operation, source }
    }
}
