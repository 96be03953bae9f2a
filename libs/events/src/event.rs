//! Event record and its attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Producer recorded when the caller does not name one.
pub const DEFAULT_PRODUCER: &str = "core";

// =============================================================================
// Identity
// =============================================================================

/// Identifier of a stored event.
///
/// The `id` is assigned once at creation and never changes. `version` is left to
/// storage backends that keep more than one revision of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventId {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl EventId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }

    /// Generates a fresh, globally unique identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the same id pinned to a specific version.
    #[must_use]
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.version {
            Some(version) => write!(f, "{}@{}", self.id, version),
            None => f.write_str(&self.id),
        }
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

// =============================================================================
// Files
// =============================================================================

/// File content carried inline with an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileData {
    Text(String),
    Bytes(Vec<u8>),
}

impl FileData {
    /// Length of the content in bytes.
    pub fn len(&self) -> usize {
        match self {
            FileData::Text(text) => text.len(),
            FileData::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileData::Text(text) => text.as_bytes(),
            FileData::Bytes(bytes) => bytes,
        }
    }
}

impl From<String> for FileData {
    fn from(text: String) -> Self {
        FileData::Text(text)
    }
}

impl From<&str> for FileData {
    fn from(text: &str) -> Self {
        FileData::Text(text.to_string())
    }
}

impl From<Vec<u8>> for FileData {
    fn from(bytes: Vec<u8>) -> Self {
        FileData::Bytes(bytes)
    }
}

/// A binary or text attachment of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFile {
    /// Empty until a file storage backend assigns an id.
    #[serde(default)]
    pub id: String,

    /// MIME type of the content.
    pub content_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Size of the content in bytes.
    pub size: u64,

    /// Content digest, if the producer supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    pub data: FileData,

    /// True when `data` points at content held elsewhere rather than the content itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reference: Option<bool>,
}

impl EventFile {
    /// Creates an unsaved file with its size taken from the content.
    pub fn new(content_type: impl Into<String>, data: impl Into<FileData>) -> Self {
        let data = data.into();
        Self {
            id: String::new(),
            content_type: content_type.into(),
            filename: None,
            size: data.len() as u64,
            hash: None,
            data,
            is_reference: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// True once a storage backend has assigned this file an id.
    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }
}

// =============================================================================
// Links
// =============================================================================

/// A typed reference from one event to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLink {
    /// Relationship name (e.g., "caused-by", "supersedes").
    #[serde(rename = "type")]
    pub link_type: String,

    pub target_event: EventId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl EventLink {
    pub fn new(link_type: impl Into<String>, target_event: impl Into<EventId>) -> Self {
        Self {
            link_type: link_type.into(),
            target_event: target_event.into(),
            metadata: None,
        }
    }
}

// =============================================================================
// Event
// =============================================================================

/// A schema-tagged record with optional files and links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,

    pub created_at: DateTime<Utc>,

    /// Who submitted the event.
    pub producer: String,

    /// JSON Schema document the payload was validated against.
    pub schema: Value,

    pub payload: Map<String, Value>,

    #[serde(default)]
    pub files: Vec<EventFile>,

    #[serde(default)]
    pub links: Vec<EventLink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Event {
    /// Creates a new event with a fresh id and the current time.
    pub fn new(schema: Value, payload: Map<String, Value>, options: EventCreationOptions) -> Self {
        Self {
            id: EventId::generate(),
            created_at: Utc::now(),
            producer: options
                .producer
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PRODUCER.to_string()),
            schema,
            payload,
            files: options.files,
            links: options.links,
            metadata: options.metadata,
        }
    }

    /// Identity of the schema used for querying: its `$id`, falling back to `id`.
    pub fn schema_id(&self) -> Option<&str> {
        self.schema
            .get("$id")
            .or_else(|| self.schema.get("id"))
            .and_then(Value::as_str)
    }
}

/// Optional parts of an event supplied at creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCreationOptions {
    #[serde(default)]
    pub producer: Option<String>,

    #[serde(default)]
    pub files: Vec<EventFile>,

    #[serde(default)]
    pub links: Vec<EventLink>,

    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl EventCreationOptions {
    pub fn producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    pub fn file(mut self, file: EventFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn link(mut self, link: EventLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_new_event_defaults() {
        let event = Event::new(
            json!({"type": "object"}),
            object(json!({"a": 1})),
            EventCreationOptions::default(),
        );

        assert_eq!(event.producer, DEFAULT_PRODUCER);
        assert!(event.files.is_empty());
        assert!(event.links.is_empty());
        assert!(event.metadata.is_none());
        assert!(!event.id.id.is_empty());
    }

    #[test]
    fn test_empty_producer_falls_back_to_default() {
        let event = Event::new(
            json!({}),
            Map::new(),
            EventCreationOptions::default().producer(""),
        );
        assert_eq!(event.producer, DEFAULT_PRODUCER);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = EventId::generate();
        let b = EventId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_schema_id_prefers_dollar_id() {
        let mut event = Event::new(
            json!({"$id": "urn:order", "id": "legacy"}),
            Map::new(),
            EventCreationOptions::default(),
        );
        assert_eq!(event.schema_id(), Some("urn:order"));

        event.schema = json!({"id": "legacy"});
        assert_eq!(event.schema_id(), Some("legacy"));

        event.schema = json!({"type": "object"});
        assert_eq!(event.schema_id(), None);
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = Event::new(
            json!({}),
            Map::new(),
            EventCreationOptions::default()
                .file(EventFile::new("text/plain", "hi"))
                .link(EventLink::new("caused-by", "evt-1")),
        );

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["files"][0]["contentType"], "text/plain");
        assert_eq!(value["files"][0]["data"], "hi");
        assert_eq!(value["links"][0]["type"], "caused-by");
        assert_eq!(value["links"][0]["targetEvent"]["id"], "evt-1");
        assert!(value["id"].get("version").is_none());
    }

    #[test]
    fn test_file_data_untagged() {
        let text: FileData = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(text, FileData::Text("abc".to_string()));

        let bytes: FileData = serde_json::from_value(json!([1, 2, 3])).unwrap();
        assert_eq!(bytes, FileData::Bytes(vec![1, 2, 3]));
        assert_eq!(bytes.len(), 3);
    }

    #[test]
    fn test_event_file_size_from_content() {
        let file = EventFile::new("application/octet-stream", vec![0u8; 16]);
        assert_eq!(file.size, 16);
        assert!(!file.is_persisted());
    }

    #[test]
    fn test_event_id_display() {
        assert_eq!(EventId::new("abc").to_string(), "abc");
        assert_eq!(EventId::new("abc").with_version(3).to_string(), "abc@3");
    }
}
