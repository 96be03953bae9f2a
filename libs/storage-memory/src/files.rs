use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::RwLock;
use trove_core::{EventFile, FileData, FileStorage};

/// File records keyed by id. Files saved without an id get a UUID.
#[derive(Default)]
pub struct MemoryFileStorage {
    files: RwLock<HashMap<String, EventFile>>,
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn save_file(&self, file: &EventFile) -> anyhow::Result<String> {
        let id = if file.is_persisted() {
            file.id.clone()
        } else {
            uuid::Uuid::new_v4().to_string()
        };

        let mut stored = file.clone();
        stored.id = id.clone();
        self.files.write().await.insert(id.clone(), stored);
        Ok(id)
    }

    async fn get_file(&self, id: &str) -> anyhow::Result<Option<EventFile>> {
        Ok(self.files.read().await.get(id).cloned())
    }

    async fn get_file_data(&self, id: &str) -> anyhow::Result<FileData> {
        self.files
            .read()
            .await
            .get(id)
            .map(|file| file.data.clone())
            .ok_or_else(|| anyhow!("file {id} not found"))
    }
}
