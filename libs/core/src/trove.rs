//! The trove orchestrator.
//!
//! Owns the lifecycle state and runs the event pipeline:
//!
//! 1. Reject a missing schema or payload
//! 2. Build the event record
//! 3. `event:validating`, then schema validation, then `event:validated`
//! 4. `event:storing`, then the storage write, then `event:stored`
//!
//! One [`HookContext`] is shared by the four event hooks of a single call.
//! Calls do not share contexts and the core takes no lock across a pipeline.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use trove_events::{Event, EventCreationOptions, EventFile, EventId, EventQuery, FileData};

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::hooks::{hook_names, HookContext, HookOutcome, HookSystem};
use crate::loader::{PluginLoader, StaticPluginLoader};
use crate::plugins::{Capability, Plugin, PluginInfo, PluginSystem};
use crate::storage::StorageManager;
use crate::validator::Validator;

/// Lifecycle of a [`Trove`].
///
/// `Stopped` accepts `initialize` again, like `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
    Stopped,
}

impl LifecycleState {
    fn accepts_initialize(self) -> bool {
        matches!(self, LifecycleState::Uninitialized | LifecycleState::Stopped)
    }
}

/// Handle to an event store instance.
///
/// Cheap to clone; all clones share one instance. Plugins receive a clone in
/// `initialize` and through [`HookContext::core`]. A plugin that keeps that
/// clone holds the instance alive until it is unloaded, which `shutdown`
/// does for every plugin.
#[derive(Clone)]
pub struct Trove {
    inner: Arc<TroveInner>,
}

struct TroveInner {
    config: CoreConfig,
    validator: Validator,
    hooks: Arc<HookSystem>,
    plugins: Arc<PluginSystem>,
    storage: StorageManager,
    loader: Arc<dyn PluginLoader>,
    state: RwLock<LifecycleState>,
}

impl Trove {
    /// Creates an instance whose loader knows no sources.
    ///
    /// Plugins can still be added with [`Trove::register_plugin`] before
    /// `initialize`.
    pub fn new(config: CoreConfig) -> Self {
        Self::with_loader(config, Arc::new(StaticPluginLoader::new()))
    }

    pub fn with_loader(config: CoreConfig, loader: Arc<dyn PluginLoader>) -> Self {
        let hooks = Arc::new(HookSystem::new());
        let plugins = Arc::new(PluginSystem::new(hooks.clone()));
        let storage = StorageManager::new(plugins.clone());

        Self {
            inner: Arc::new(TroveInner {
                config,
                validator: Validator::new(),
                hooks,
                plugins,
                storage,
                loader,
                state: RwLock::new(LifecycleState::Uninitialized),
            }),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Loads configured plugins, resolves storage and becomes ready.
    ///
    /// On failure the state returns to `Uninitialized`. Plugins loaded before
    /// the failure stay loaded.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        {
            let mut state = self.inner.state.write().await;
            if !state.accepts_initialize() {
                return Err(CoreError::AlreadyInitialized);
            }
            *state = LifecycleState::Initializing;
        }
        info!("Initializing trove");

        if let Err(e) = self.start().await {
            *self.inner.state.write().await = LifecycleState::Uninitialized;
            return Err(e);
        }

        let mut ctx = HookContext::new(self.clone());
        self.inner
            .hooks
            .execute_hook(hook_names::SYSTEM_INITIALIZED, &mut ctx)
            .await;

        *self.inner.state.write().await = LifecycleState::Ready;
        info!("Trove initialized");
        Ok(())
    }

    async fn start(&self) -> Result<(), CoreError> {
        self.inner
            .plugins
            .load_plugins(
                &self.inner.config.plugins.sources,
                self.inner.loader.as_ref(),
                self,
            )
            .await?;

        self.inner
            .storage
            .initialize(&self.inner.config.storage)
            .await
    }

    /// Unloads every plugin and stops. Does nothing unless ready.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.write().await;
            if *state != LifecycleState::Ready {
                return;
            }
            *state = LifecycleState::ShuttingDown;
        }
        info!("Shutting down trove");

        let mut ctx = HookContext::new(self.clone());
        self.inner
            .hooks
            .execute_hook(hook_names::SYSTEM_SHUTTING_DOWN, &mut ctx)
            .await;

        for plugin in self.inner.plugins.get_all_plugins().await {
            self.inner.plugins.unload_plugin(plugin.name()).await;
        }
        self.inner.storage.reset().await;

        *self.inner.state.write().await = LifecycleState::Stopped;
        info!("Trove stopped");
    }

    pub async fn state(&self) -> LifecycleState {
        *self.inner.state.read().await
    }

    async fn ensure_ready(&self) -> Result<(), CoreError> {
        if self.state().await == LifecycleState::Ready {
            Ok(())
        } else {
            Err(CoreError::NotInitialized)
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Validates, runs the event hooks and stores a new event.
    ///
    /// `payload` must be a JSON object. Handlers of `event:storing` may edit
    /// the event in the context; the edited event is what gets saved.
    #[instrument(skip_all, fields(event_id))]
    pub async fn create_event(
        &self,
        schema: Value,
        payload: Value,
        options: EventCreationOptions,
    ) -> Result<Event, CoreError> {
        self.ensure_ready().await?;

        if schema.is_null() {
            return Err(CoreError::InvalidArgument("schema is required".into()));
        }
        let payload = match payload {
            Value::Object(payload) => payload,
            Value::Null => return Err(CoreError::InvalidArgument("payload is required".into())),
            _ => {
                return Err(CoreError::InvalidArgument(
                    "payload must be a JSON object".into(),
                ))
            }
        };

        let event = Event::new(schema, payload, options);
        tracing::Span::current().record("event_id", tracing::field::display(&event.id));
        let mut ctx = HookContext::with_event(self.clone(), event);

        self.fire(hook_names::EVENT_VALIDATING, &mut ctx).await;
        let event = attached(&ctx, hook_names::EVENT_VALIDATING)?;

        let payload = Value::Object(event.payload.clone());
        let outcome = self.inner.validator.validate(&event.schema, &payload);
        if !outcome.valid {
            warn!(
                event_id = %event.id,
                errors = outcome.errors.len(),
                "Event validation failed"
            );
            return Err(CoreError::EventValidationFailed {
                event: Box::new(event.clone()),
                errors: outcome.errors,
            });
        }

        self.fire(hook_names::EVENT_VALIDATED, &mut ctx).await;
        attached(&ctx, hook_names::EVENT_VALIDATED)?;

        self.fire(hook_names::EVENT_STORING, &mut ctx).await;
        let mut event = ctx.event.take().ok_or_else(|| CoreError::EventDetached {
            hook: hook_names::EVENT_STORING.to_string(),
        })?;

        let saved = self.inner.storage.save_event(&mut event).await?;

        ctx.event = Some(saved.clone());
        self.fire(hook_names::EVENT_STORED, &mut ctx).await;

        info!(event_id = %saved.id, producer = %saved.producer, "Created event");
        Ok(saved)
    }

    async fn fire(&self, hook: &str, ctx: &mut HookContext) {
        self.inner.hooks.execute_hook(hook, ctx).await;
    }

    #[instrument(skip_all, fields(event_id = %id))]
    pub async fn get_event(&self, id: &EventId) -> Result<Option<Event>, CoreError> {
        self.ensure_ready().await?;
        self.inner.storage.get_event(id).await
    }

    #[instrument(skip_all)]
    pub async fn query_events(&self, query: &EventQuery) -> Result<Vec<Event>, CoreError> {
        self.ensure_ready().await?;
        self.inner.storage.query_events(query).await
    }

    pub async fn get_file(&self, id: &str) -> Result<Option<EventFile>, CoreError> {
        self.ensure_ready().await?;
        self.inner.storage.get_file(id).await
    }

    pub async fn get_file_data(&self, id: &str) -> Result<FileData, CoreError> {
        self.ensure_ready().await?;
        self.inner.storage.get_file_data(id).await
    }

    // =========================================================================
    // Extension points
    // =========================================================================

    /// Loads a plugin into this instance. Works in any lifecycle state.
    pub async fn register_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<(), CoreError> {
        self.inner.plugins.load_plugin(plugin, self).await
    }

    pub async fn unregister_plugin(&self, name: &str) {
        self.inner.plugins.unload_plugin(name).await;
    }

    pub async fn get_plugin(
        &self,
        name: &str,
        required: &[Capability],
    ) -> Option<Arc<dyn Plugin>> {
        self.inner.plugins.get_plugin(name, required).await
    }

    pub async fn plugins(&self) -> Vec<PluginInfo> {
        self.inner.plugins.plugin_infos().await
    }

    /// Dispatches a hook by name, including hooks the core never fires itself.
    pub async fn execute_hook(&self, name: &str, ctx: &mut HookContext) -> Vec<HookOutcome> {
        self.inner.hooks.execute_hook(name, ctx).await
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    /// Settings for `plugin` from the `plugins.config` table.
    pub fn plugin_config(&self, plugin: &str) -> Option<&Value> {
        self.inner.config.plugins.config.get(plugin)
    }

    pub fn validator(&self) -> &Validator {
        &self.inner.validator
    }
}

impl fmt::Debug for Trove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.try_read().map(|s| *s).ok();
        f.debug_struct("Trove")
            .field("state", &state)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn attached<'a>(ctx: &'a HookContext, hook: &str) -> Result<&'a Event, CoreError> {
    ctx.event.as_ref().ok_or_else(|| {
        warn!(hook, "Event was removed from the hook context");
        CoreError::EventDetached {
            hook: hook.to_string(),
        }
    })
}
