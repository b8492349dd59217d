//! Naive CTR common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the pipeline crates:
//! - Request, item, and run identity types
//! - Log, item-event, aggregated, and scored record types
//! - Common error types
//! - Schema versioning and table column names

pub mod error;
pub mod id;
pub mod record;
pub mod schema;

pub use error::{Error, Result};
pub use id::{ItemId, RequestId, RunId};
pub use record::{AggregatedItem, EventType, ItemEvent, LogRecord, Position, ScoredItem};
pub use schema::SCHEMA_VERSION;

/// CTR reported for items the estimator has never seen.
pub const UNSEEN_CTR: f64 = -1.0;
