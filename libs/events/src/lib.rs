//! # trove-events
//!
//! Record types for the trove event store.
//!
//! ## Design Principles
//!
//! - An event is created once, with a fresh id and timestamp, and never re-keyed
//! - Files and links travel with the event but may be persisted by separate backends
//! - A file id may be empty until a file backend assigns one during the first save
//! - Everything here is plain data; persistence and validation live in `trove-core`
//!
//! ## Wire Format
//!
//! All types serialize with camelCase field names so that records written by one
//! storage backend can be read by another (or handed to a JSON consumer) unchanged.

mod event;
mod query;

pub use event::*;
pub use query::*;
