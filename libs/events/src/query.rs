//! Event query model.
//!
//! The core hands queries to the configured event backend untouched. Backends
//! that keep records in memory (or can fetch a candidate set cheaply) can use
//! [`EventQuery::apply`] to get the reference semantics:
//!
//! - `schema` / `producer`: the event must match any one of the listed values
//! - `time_range`: inclusive on both ends
//! - `links`: every link filter must be satisfied by at least one link
//! - `payload`: every listed top-level key must be present with an equal value
//! - `sort`, then `offset`, then `limit`

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Event, EventId};

/// Filter, sort and pagination parameters for reading events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    /// Schema ids (see [`Event::schema_id`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<LinkFilter>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortSpec>,
}

/// Inclusive creation-time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// Matches events carrying a link of the given type and/or target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFilter {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_event: Option<EventId>,
}

/// Sortable event fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreatedAt,
    Producer,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl EventQuery {
    /// A query matching every event.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema_id: impl Into<String>) -> Self {
        self.schema.get_or_insert_with(Vec::new).push(schema_id.into());
        self
    }

    pub fn producer(mut self, producer: impl Into<String>) -> Self {
        self.producer
            .get_or_insert_with(Vec::new)
            .push(producer.into());
        self
    }

    pub fn link(mut self, filter: LinkFilter) -> Self {
        self.links.get_or_insert_with(Vec::new).push(filter);
        self
    }

    pub fn payload_eq(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn sort_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort.push(SortSpec { field, direction });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the event passes every filter of this query.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(schemas) = &self.schema {
            match event.schema_id() {
                Some(id) if schemas.iter().any(|s| s == id) => {}
                _ => return false,
            }
        }

        if let Some(producers) = &self.producer {
            if !producers.iter().any(|p| *p == event.producer) {
                return false;
            }
        }

        if let Some(range) = &self.time_range {
            if range.start.is_some_and(|start| event.created_at < start) {
                return false;
            }
            if range.end.is_some_and(|end| event.created_at > end) {
                return false;
            }
        }

        if let Some(filters) = &self.links {
            let all_matched = filters.iter().all(|filter| {
                event.links.iter().any(|link| {
                    filter
                        .link_type
                        .as_ref()
                        .is_none_or(|t| *t == link.link_type)
                        && filter
                            .target_event
                            .as_ref()
                            .is_none_or(|target| target.id == link.target_event.id)
                })
            });
            if !all_matched {
                return false;
            }
        }

        if let Some(expected) = &self.payload {
            let all_equal = expected
                .iter()
                .all(|(key, value)| event.payload.get(key) == Some(value));
            if !all_equal {
                return false;
            }
        }

        true
    }

    /// Filters, sorts and paginates a candidate set.
    pub fn apply(&self, events: impl IntoIterator<Item = Event>) -> Vec<Event> {
        let mut matched: Vec<Event> = events.into_iter().filter(|e| self.matches(e)).collect();

        if !self.sort.is_empty() {
            matched.sort_by(|a, b| self.compare(a, b));
        }

        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        matched.into_iter().skip(offset).take(limit).collect()
    }

    fn compare(&self, a: &Event, b: &Event) -> Ordering {
        for spec in &self.sort {
            let ordering = match spec.field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Producer => a.producer.cmp(&b.producer),
                SortField::Id => a.id.id.cmp(&b.id.id),
            };
            let ordering = match spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
