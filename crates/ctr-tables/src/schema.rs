//! Arrow schemas for pipeline tables.
//!
//! Column names and order are part of the contract with downstream
//! consumers: the aggregated table is exactly `item, click, impress` and
//! the scored table exactly `item_id, expected_ctr`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use ctr_common::schema::columns;
use ctr_common::SCHEMA_VERSION;

/// Schema metadata key carrying the table schema version.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

fn versioned(fields: Vec<Field>) -> Schema {
    Schema::new_with_metadata(
        fields,
        HashMap::from([(SCHEMA_VERSION_KEY.to_string(), SCHEMA_VERSION.to_string())]),
    )
}

/// Element field of every `List<Utf8>` column.
pub(crate) fn item_list_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
}

/// Request log table. The `impressions_visible` column is optional; its
/// presence selects the visible variant.
pub fn log_schema(with_visible: bool) -> Schema {
    let mut fields = vec![
        Field::new(columns::REQUEST_ID, DataType::Utf8, false),
        Field::new(columns::IMPRESSIONS, item_list_type(), false),
    ];
    if with_visible {
        fields.push(Field::new(columns::IMPRESSIONS_VISIBLE, item_list_type(), true));
    }
    fields.push(Field::new(columns::EVENT_ITEM, DataType::Utf8, true));
    fields.push(Field::new(columns::EVENT_TYPE, DataType::Utf8, false));
    versioned(fields)
}

/// Item-event table.
pub fn item_event_schema() -> Schema {
    versioned(vec![
        Field::new(columns::REQUEST_ID, DataType::Utf8, false),
        Field::new(columns::ITEM, DataType::Utf8, true),
        Field::new(columns::POSITION, DataType::Int64, false),
        Field::new(columns::EVENT_TYPE, DataType::Utf8, false),
    ])
}

/// Aggregated per-item counts.
pub fn aggregated_schema() -> Schema {
    versioned(vec![
        Field::new(columns::ITEM, DataType::Utf8, false),
        Field::new(columns::CLICK, DataType::Int64, false),
        Field::new(columns::IMPRESS, DataType::Int64, false),
    ])
}

/// Batch scoring output.
pub fn scored_schema() -> Schema {
    versioned(vec![
        Field::new(columns::ITEM_ID, DataType::Utf8, false),
        Field::new(columns::EXPECTED_CTR, DataType::Float64, false),
    ])
}

/// Batch scoring input.
pub fn item_id_schema() -> Schema {
    versioned(vec![Field::new(columns::ITEM_ID, DataType::Utf8, false)])
}

/// Pipeline tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    Logs,
    ItemEvents,
    Aggregated,
    Scored,
    ItemIds,
}

impl TableName {
    pub const ALL: [TableName; 5] = [
        TableName::Logs,
        TableName::ItemEvents,
        TableName::Aggregated,
        TableName::Scored,
        TableName::ItemIds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Logs => "logs",
            TableName::ItemEvents => "item_events",
            TableName::Aggregated => "aggregated",
            TableName::Scored => "scored",
            TableName::ItemIds => "item_ids",
        }
    }

    /// Canonical schema. Logs include the optional visible column.
    pub fn schema(&self) -> Schema {
        match self {
            TableName::Logs => log_schema(true),
            TableName::ItemEvents => item_event_schema(),
            TableName::Aggregated => aggregated_schema(),
            TableName::Scored => scored_schema(),
            TableName::ItemIds => item_id_schema(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
