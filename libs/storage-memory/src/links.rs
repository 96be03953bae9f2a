use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use trove_core::{EventId, EventLink, LinkStorage};

/// Outgoing links keyed by source event id, in save order.
#[derive(Default)]
pub struct MemoryLinkStorage {
    links: RwLock<HashMap<String, Vec<EventLink>>>,
}

#[async_trait]
impl LinkStorage for MemoryLinkStorage {
    async fn save_link(&self, event_id: &EventId, link: &EventLink) -> anyhow::Result<()> {
        self.links
            .write()
            .await
            .entry(event_id.id.clone())
            .or_default()
            .push(link.clone());
        Ok(())
    }

    async fn get_links(
        &self,
        event_id: &EventId,
        link_type: Option<&str>,
    ) -> anyhow::Result<Vec<EventLink>> {
        let links = self.links.read().await;
        let Some(saved) = links.get(&event_id.id) else {
            return Ok(Vec::new());
        };

        Ok(saved
            .iter()
            .filter(|link| link_type.is_none_or(|t| link.link_type == t))
            .cloned()
            .collect())
    }
}
