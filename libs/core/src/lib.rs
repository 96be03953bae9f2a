//! Core of the trove event store.
//!
//! This crate provides:
//! - [`HookSystem`]: priority-ordered, fault-isolated hook dispatch
//! - [`PluginSystem`]: plugin registry with load/initialize/unload lifecycle
//! - [`PluginLoader`]: the seam through which hosts supply plugins
//! - [`StorageManager`]: capability-gated event, file and link storage
//! - [`Validator`]: JSON Schema validation of payloads
//! - [`Trove`]: lifecycle state and the event create/read pipeline
//!
//! Storage backends are plugins; see `trove-storage-memory` for the
//! in-memory one.

pub mod config;
pub mod error;
pub mod hooks;
pub mod loader;
pub mod plugins;
pub mod storage;
pub mod trove;
pub mod validator;

#[cfg(test)]
mod testing;

pub use config::{
    CoreConfig, LinkStorageConfig, PluginsConfig, StorageConfig, StoragePluginConfig,
    USE_EVENT_STORAGE,
};
pub use error::CoreError;
pub use hooks::{
    hook_fn, hook_names, HookBinding, HookContext, HookHandler, HookOutcome, HookSystem,
};
pub use loader::{PluginLoader, StaticPluginLoader};
pub use plugins::{Capability, HookRegistration, Plugin, PluginInfo, PluginSystem};
pub use storage::{EventStorage, FileStorage, LinkStorage, StorageManager};
pub use trove::{LifecycleState, Trove};
pub use validator::{ValidationIssue, ValidationOutcome, Validator};

pub use trove_events;
pub use trove_events::{
    Event, EventCreationOptions, EventFile, EventId, EventLink, EventQuery, FileData,
};
