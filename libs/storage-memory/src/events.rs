use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use trove_core::{Event, EventId, EventQuery, EventStorage};

/// Event records keyed by id.
#[derive(Default)]
pub struct MemoryEventStorage {
    events: RwLock<HashMap<String, Event>>,
}

impl MemoryEventStorage {
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStorage for MemoryEventStorage {
    async fn save_event(&self, event: &Event) -> anyhow::Result<Event> {
        self.events
            .write()
            .await
            .insert(event.id.id.clone(), event.clone());
        Ok(event.clone())
    }

    async fn get_event(&self, id: &EventId) -> anyhow::Result<Option<Event>> {
        Ok(self.events.read().await.get(&id.id).cloned())
    }

    async fn query_events(&self, query: &EventQuery) -> anyhow::Result<Vec<Event>> {
        // Map order is arbitrary; sort by creation time so unsorted queries are stable.
        let mut events: Vec<Event> = self.events.read().await.values().cloned().collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(query.apply(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use trove_core::trove_events::{SortDirection, SortField};
    use trove_core::EventCreationOptions;

    fn event(producer: &str, n: i64) -> Event {
        let mut payload = Map::new();
        payload.insert("n".into(), json!(n));
        Event::new(
            json!({"$id": "counter"}),
            payload,
            EventCreationOptions::default().producer(producer),
        )
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let storage = MemoryEventStorage::default();
        let saved = storage.save_event(&event("p", 1)).await.unwrap();

        let read = storage.get_event(&saved.id).await.unwrap();
        assert_eq!(read, Some(saved));
        assert!(storage
            .get_event(&EventId::new("missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_same_id_overwrites() {
        let storage = MemoryEventStorage::default();
        let mut e = event("p", 1);
        storage.save_event(&e).await.unwrap();
        e.payload.insert("n".into(), json!(2));
        storage.save_event(&e).await.unwrap();

        assert_eq!(storage.len().await, 1);
        let read = storage.get_event(&e.id).await.unwrap().unwrap();
        assert_eq!(read.payload["n"], json!(2));
    }

    #[tokio::test]
    async fn test_query_filters_and_sorts() {
        let storage = MemoryEventStorage::default();
        for (producer, n) in [("a", 1), ("b", 2), ("a", 3)] {
            storage.save_event(&event(producer, n)).await.unwrap();
        }

        let found = storage
            .query_events(
                &EventQuery::all()
                    .producer("a")
                    .sort_by(SortField::CreatedAt, SortDirection::Desc),
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.producer == "a"));
        assert!(found[0].created_at >= found[1].created_at);

        let by_payload = storage
            .query_events(&EventQuery::all().payload_eq("n", json!(2)))
            .await
            .unwrap();
        assert_eq!(by_payload.len(), 1);
        assert_eq!(by_payload[0].producer, "b");
    }
}
