//! Naive CTR tabular boundary.
//!
//! This crate provides:
//! - Arrow schema definitions for the log, item-event, aggregated, scored,
//!   and item-id tables
//! - Conversion between those tables and the record types of `ctr-common`
//! - Pretty-printing for inspection

pub mod convert;
pub mod error;
pub mod schema;

pub use convert::{
    aggregated_from_batch, aggregated_to_batch, events_from_batch, events_to_batch,
    format_batches, item_ids_from_batch, item_ids_to_batch, logs_from_batch, logs_to_batch,
    scored_from_batch, scored_to_batch, LogTable,
};
pub use error::{Result, TableError};
pub use schema::{
    aggregated_schema, item_event_schema, item_id_schema, log_schema, scored_schema, TableName,
    SCHEMA_VERSION_KEY,
};
