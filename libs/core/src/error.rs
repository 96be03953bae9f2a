//! Error types for the trove core.

use thiserror::Error;
use trove_events::Event;

use crate::plugins::Capability;
use crate::validator::{Validator, ValidationIssue};

/// Errors surfaced by the public trove operations.
///
/// Errors raised by plugin code (hooks, lifecycle methods, storage roles) are
/// `anyhow::Error`s; the variants that wrap them keep the original error as
/// their `source`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The storage configuration has no `events` section.
    #[error("event storage configuration is required")]
    MissingEventStorageConfig,

    /// No loaded plugin has the requested name and capabilities.
    #[error(
        "plugin {plugin} not found with required capabilities [{}]",
        join_capabilities(.capabilities)
    )]
    PluginResolutionFailed {
        plugin: String,
        capabilities: Vec<Capability>,
    },

    /// A plugin with the same name is already loaded.
    #[error("plugin {0} is already registered")]
    DuplicatePlugin(String),

    /// A plugin's `initialize` failed; the plugin has been unloaded again.
    #[error("failed to initialize plugin {plugin}: {source}")]
    PluginInitializationFailed {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    /// A plugin loader could not process its sources at all.
    #[error("plugin loading failed: {0}")]
    PluginLoadFailed(#[source] anyhow::Error),

    /// The payload does not satisfy the event's schema.
    #[error("event validation failed: {}", Validator::format_errors(.errors))]
    EventValidationFailed {
        event: Box<Event>,
        errors: Vec<ValidationIssue>,
    },

    /// A hook handler removed the event from the pipeline context.
    #[error("event was detached from the hook context during {hook}")]
    EventDetached { hook: String },

    /// The operation requires a ready system.
    #[error("trove is not initialized")]
    NotInitialized,

    /// `initialize` was called on a system that is not stopped.
    #[error("trove is already initialized")]
    AlreadyInitialized,

    /// A required argument is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A storage plugin call failed.
    #[error("storage operation {operation} failed: {source}")]
    StorageOperationFailed {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A file read was requested but no file storage plugin is configured.
    #[error("no file storage plugin is configured")]
    FileStorageUnavailable,
}

impl CoreError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::MissingEventStorageConfig => "configuration_error",
            CoreError::PluginResolutionFailed { .. } => "plugin_resolution_failed",
            CoreError::DuplicatePlugin(_) => "duplicate_plugin",
            CoreError::PluginInitializationFailed { .. } => "plugin_initialization_failed",
            CoreError::PluginLoadFailed(_) => "plugin_load_failed",
            CoreError::EventValidationFailed { .. } => "event_validation_failed",
            CoreError::EventDetached { .. } => "event_detached",
            CoreError::NotInitialized => "not_initialized",
            CoreError::AlreadyInitialized => "already_initialized",
            CoreError::InvalidArgument(_) => "invalid_argument",
            CoreError::StorageOperationFailed { .. } => "storage_operation_failed",
            CoreError::FileStorageUnavailable => "file_storage_unavailable",
        }
    }

    /// Returns the rejected event and its issues if this is a validation failure.
    pub fn validation_details(&self) -> Option<(&Event, &[ValidationIssue])> {
        match self {
            CoreError::EventValidationFailed { event, errors } => {
                Some((event.as_ref(), errors.as_slice()))
            }
            _ => None,
        }
    }
}

fn join_capabilities(capabilities: &[Capability]) -> String {
    capabilities
        .iter()
        .map(Capability::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_message_lists_capabilities() {
        let err = CoreError::PluginResolutionFailed {
            plugin: "x".to_string(),
            capabilities: vec![Capability::EventStorage, Capability::FileStorage],
        };
        assert_eq!(
            err.to_string(),
            "plugin x not found with required capabilities [storage:events, storage:files]"
        );
        assert_eq!(err.code(), "plugin_resolution_failed");
    }

    #[test]
    fn test_wrapped_source_is_preserved() {
        let err = CoreError::StorageOperationFailed {
            operation: "save_event",
            source: anyhow::anyhow!("disk full"),
        };
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "disk full");
    }
}
