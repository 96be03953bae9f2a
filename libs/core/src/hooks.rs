//! Hook dispatch.
//!
//! A hook is a named extension point. Plugins bind handlers to it with a
//! priority; dispatch runs the handlers one at a time:
//!
//! - Higher priority first; equal priorities keep registration order
//! - Each handler finishes before the next one starts
//! - A failing handler is logged and skipped, it never aborts the dispatch
//!
//! Bindings are an append-only multiset: registering the same handler twice
//! yields two bindings.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, debug_span, error, Instrument};
use trove_events::Event;

use crate::Trove;

/// Hook names emitted by the core.
pub mod hook_names {
    pub const SYSTEM_INITIALIZED: &str = "system:initialized";
    pub const SYSTEM_SHUTTING_DOWN: &str = "system:shutting-down";
    pub const EVENT_VALIDATING: &str = "event:validating";
    pub const EVENT_VALIDATED: &str = "event:validated";
    pub const EVENT_STORING: &str = "event:storing";
    pub const EVENT_STORED: &str = "event:stored";
}

// =============================================================================
// Context
// =============================================================================

/// State handed to every handler of a dispatch.
///
/// The event pipeline creates one context per `create_event` call and passes
/// it to all of that call's hooks, so `state` written by an early hook is
/// visible to later ones. Handlers of `event:storing` may replace or edit
/// `event`; the pipeline saves whatever the context holds afterwards.
pub struct HookContext {
    pub core: Trove,
    pub event: Option<Event>,
    pub state: HashMap<String, Value>,
}

impl HookContext {
    /// A context with no event (system hooks).
    pub fn new(core: Trove) -> Self {
        Self {
            core,
            event: None,
            state: HashMap::new(),
        }
    }

    pub fn with_event(core: Trove, event: Event) -> Self {
        Self {
            core,
            event: Some(event),
            state: HashMap::new(),
        }
    }
}

impl fmt::Debug for HookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("event", &self.event.as_ref().map(|e| &e.id))
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// A hook handler.
#[async_trait]
pub trait HookHandler: Send + Sync {
    async fn handle(&self, ctx: &mut HookContext) -> anyhow::Result<Value>;
}

/// Adapter running a synchronous closure as a handler.
pub struct FnHook<F>(F);

#[async_trait]
impl<F> HookHandler for FnHook<F>
where
    F: Fn(&mut HookContext) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    async fn handle(&self, ctx: &mut HookContext) -> anyhow::Result<Value> {
        (self.0)(ctx)
    }
}

/// Wraps a synchronous closure into a shareable handler.
pub fn hook_fn<F>(f: F) -> Arc<dyn HookHandler>
where
    F: Fn(&mut HookContext) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnHook(f))
}

/// A handler bound to a hook name on behalf of a plugin.
#[derive(Clone)]
pub struct HookBinding {
    pub plugin_id: String,
    pub priority: i32,
    pub handler: Arc<dyn HookHandler>,
}

impl fmt::Debug for HookBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookBinding")
            .field("plugin_id", &self.plugin_id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Result of one successful handler invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutcome {
    pub plugin_id: String,
    pub result: Value,
}

// =============================================================================
// Hook System
// =============================================================================

/// Registry and dispatcher of hook bindings.
#[derive(Default)]
pub struct HookSystem {
    hooks: RwLock<HashMap<String, Vec<HookBinding>>>,
}

impl HookSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding under `hook_name`.
    pub async fn register_hook(
        &self,
        plugin_id: impl Into<String>,
        hook_name: impl Into<String>,
        handler: Arc<dyn HookHandler>,
        priority: i32,
    ) {
        let plugin_id = plugin_id.into();
        let hook_name = hook_name.into();
        debug!(hook = %hook_name, plugin = %plugin_id, priority, "Registered hook");

        self.hooks
            .write()
            .await
            .entry(hook_name)
            .or_default()
            .push(HookBinding {
                plugin_id,
                priority,
                handler,
            });
    }

    /// Runs every handler bound to `name`, in priority order.
    ///
    /// The bindings are snapshotted before the first handler runs, so handlers
    /// may register or unregister hooks without affecting this dispatch.
    /// Returns the results of the handlers that succeeded, in execution order.
    pub async fn execute_hook(&self, name: &str, ctx: &mut HookContext) -> Vec<HookOutcome> {
        let mut bindings = match self.hooks.read().await.get(name) {
            Some(bindings) if !bindings.is_empty() => bindings.clone(),
            _ => {
                debug!(hook = name, "No handlers registered for hook");
                return Vec::new();
            }
        };

        // Stable sort keeps registration order within a priority.
        bindings.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut outcomes = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let span = debug_span!("hook", hook = name, plugin = %binding.plugin_id);
            debug!(hook = name, plugin = %binding.plugin_id, "Executing hook");

            match binding.handler.handle(ctx).instrument(span).await {
                Ok(result) => outcomes.push(HookOutcome {
                    plugin_id: binding.plugin_id,
                    result,
                }),
                Err(e) => {
                    error!(
                        hook = name,
                        plugin = %binding.plugin_id,
                        error = %e,
                        "Error executing hook"
                    );
                }
            }
        }

        outcomes
    }

    /// Removes every binding owned by `plugin_id`, pruning emptied hook names.
    pub async fn unregister_plugin(&self, plugin_id: &str) {
        let mut hooks = self.hooks.write().await;
        hooks.retain(|_, bindings| {
            bindings.retain(|b| b.plugin_id != plugin_id);
            !bindings.is_empty()
        });
    }

    /// Number of bindings under `name`.
    pub async fn handler_count(&self, name: &str) -> usize {
        self.hooks.read().await.get(name).map_or(0, Vec::len)
    }

    /// Hook names that currently have at least one binding.
    pub async fn hook_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hooks.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
