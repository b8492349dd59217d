//! Conversion between record vectors and Arrow record batches.
//!
//! Every conversion preserves row count and row order.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, ListArray, ListBuilder, StringArray, StringBuilder,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use ctr_common::schema::columns;
use ctr_common::{
    AggregatedItem, EventType, ItemEvent, ItemId, LogRecord, Position, RequestId, ScoredItem,
};
use ctr_config::VariantSelection;
use ctr_core::{Pipeline, PipelineOutput, PipelineVariant};
use tracing::debug;

use crate::error::{Result, TableError};
use crate::schema::{
    aggregated_schema, item_event_schema, item_id_schema, item_list_type, log_schema,
    scored_schema, SCHEMA_VERSION_KEY,
};

// ── Reading helpers ─────────────────────────────────────────────────────

/// Reject batches stamped with an incompatible schema version. Unstamped
/// batches are accepted.
fn check_version(batch: &RecordBatch) -> Result<()> {
    let schema = batch.schema();
    match schema.metadata().get(SCHEMA_VERSION_KEY) {
        Some(found) if !ctr_common::schema::is_compatible(found) => {
            Err(TableError::IncompatibleVersion {
                found: found.clone(),
                current: ctr_common::SCHEMA_VERSION.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    expected: DataType,
) -> Result<&'a T> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| TableError::MissingColumn(name.to_string()))?;
    col.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| TableError::ColumnType {
            column: name.to_string(),
            expected,
            actual: col.data_type().clone(),
        })
}

fn required_str<'a>(arr: &'a StringArray, row: usize, name: &str) -> Result<&'a str> {
    if arr.is_null(row) {
        return Err(TableError::NullValue {
            column: name.to_string(),
            row,
        });
    }
    Ok(arr.value(row))
}

fn optional_str(arr: &StringArray, row: usize) -> Option<&str> {
    if arr.is_null(row) {
        None
    } else {
        Some(arr.value(row))
    }
}

fn required_i64(arr: &Int64Array, row: usize, name: &str) -> Result<i64> {
    if arr.is_null(row) {
        return Err(TableError::NullValue {
            column: name.to_string(),
            row,
        });
    }
    Ok(arr.value(row))
}

fn count_from_i64(value: i64, row: usize, name: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| TableError::CountOutOfRange {
        column: name.to_string(),
        row,
        value: value.into(),
    })
}

fn count_to_i64(value: u64, row: usize, name: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| TableError::CountOutOfRange {
        column: name.to_string(),
        row,
        value: value.into(),
    })
}

fn event_type_at(arr: &StringArray, row: usize) -> Result<EventType> {
    required_str(arr, row, columns::EVENT_TYPE)?
        .parse()
        .map_err(|source| TableError::InvalidValue {
            column: columns::EVENT_TYPE.to_string(),
            row,
            source,
        })
}

/// Item list at `row`, `None` when the list itself is null.
fn item_list(list: &ListArray, row: usize, name: &str) -> Result<Option<Vec<ItemId>>> {
    if list.is_null(row) {
        return Ok(None);
    }
    let values = list.value(row);
    let strings = values
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| TableError::ColumnType {
            column: name.to_string(),
            expected: item_list_type(),
            actual: list.data_type().clone(),
        })?;
    let mut items = Vec::with_capacity(strings.len());
    for i in 0..strings.len() {
        items.push(ItemId::from(required_str(strings, i, name)?));
    }
    Ok(Some(items))
}

// ── Building helpers ────────────────────────────────────────────────────

fn item_list_array<'a, I>(lists: I) -> ListArray
where
    I: IntoIterator<Item = Option<&'a [ItemId]>>,
{
    let mut builder = ListBuilder::new(StringBuilder::new());
    for list in lists {
        match list {
            Some(items) => {
                for item in items {
                    builder.values().append_value(item.as_str());
                }
                builder.append(true);
            }
            None => builder.append(false),
        }
    }
    builder.finish()
}

// ── Log table ───────────────────────────────────────────────────────────

/// Log rows read from a batch, plus whether the batch had a
/// visible-impressions column.
#[derive(Debug, Clone, PartialEq)]
pub struct LogTable {
    pub records: Vec<LogRecord>,
    pub has_visible_column: bool,
}

impl LogTable {
    /// Variant for `selection`. `Auto` follows the presence of the visible
    /// column, not the per-row values.
    pub fn variant(&self, selection: VariantSelection) -> PipelineVariant {
        PipelineVariant::for_column(selection, self.has_visible_column)
    }

    /// Run `pipeline` over the table's rows with the variant its schema
    /// implies.
    pub fn run(
        &self,
        pipeline: &Pipeline,
        item_ids: &[ItemId],
    ) -> ctr_common::Result<PipelineOutput> {
        let variant = self.variant(pipeline.config().variant);
        pipeline.run_variant(&self.records, item_ids, variant)
    }
}

/// Build a log batch. The visible column is written iff some record
/// carries an override.
pub fn logs_to_batch(records: &[LogRecord]) -> Result<RecordBatch> {
    let with_visible = records.iter().any(|r| r.impressions_visible.is_some());

    let request_ids: Vec<&str> = records.iter().map(|r| r.request_id.as_str()).collect();
    let impressions = item_list_array(records.iter().map(|r| Some(r.impressions.as_slice())));
    let event_items: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.event_item.as_ref().map(ItemId::as_str))
        .collect();
    let event_types: Vec<&str> = records.iter().map(|r| r.event_type.as_str()).collect();

    let mut cols: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(request_ids)),
        Arc::new(impressions),
    ];
    if with_visible {
        let visible = item_list_array(records.iter().map(|r| r.impressions_visible.as_deref()));
        cols.push(Arc::new(visible));
    }
    cols.push(Arc::new(StringArray::from(event_items)));
    cols.push(Arc::new(StringArray::from(event_types)));

    Ok(RecordBatch::try_new(
        Arc::new(log_schema(with_visible)),
        cols,
    )?)
}

/// Read log rows from a batch.
pub fn logs_from_batch(batch: &RecordBatch) -> Result<LogTable> {
    check_version(batch)?;
    let request_ids = column::<StringArray>(batch, columns::REQUEST_ID, DataType::Utf8)?;
    let impressions = column::<ListArray>(batch, columns::IMPRESSIONS, item_list_type())?;
    let visible = match batch.column_by_name(columns::IMPRESSIONS_VISIBLE) {
        Some(_) => Some(column::<ListArray>(
            batch,
            columns::IMPRESSIONS_VISIBLE,
            item_list_type(),
        )?),
        None => None,
    };
    let event_items = column::<StringArray>(batch, columns::EVENT_ITEM, DataType::Utf8)?;
    let event_types = column::<StringArray>(batch, columns::EVENT_TYPE, DataType::Utf8)?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let impressions = item_list(impressions, row, columns::IMPRESSIONS)?.ok_or_else(|| {
            TableError::NullValue {
                column: columns::IMPRESSIONS.to_string(),
                row,
            }
        })?;
        let impressions_visible = match visible {
            Some(list) => item_list(list, row, columns::IMPRESSIONS_VISIBLE)?,
            None => None,
        };
        records.push(LogRecord {
            request_id: RequestId::from(required_str(request_ids, row, columns::REQUEST_ID)?),
            impressions,
            impressions_visible,
            event_item: optional_str(event_items, row).map(ItemId::from),
            event_type: event_type_at(event_types, row)?,
        });
    }

    debug!(
        rows = records.len(),
        visible_column = visible.is_some(),
        "read log table"
    );
    Ok(LogTable {
        records,
        has_visible_column: visible.is_some(),
    })
}

// ── Item-event table ────────────────────────────────────────────────────

pub fn events_to_batch(events: &[ItemEvent]) -> Result<RecordBatch> {
    let request_ids: Vec<&str> = events.iter().map(|e| e.request_id.as_str()).collect();
    let items: Vec<Option<&str>> = events
        .iter()
        .map(|e| e.item.as_ref().map(ItemId::as_str))
        .collect();
    let positions: Vec<i64> = events.iter().map(|e| e.position.as_i64()).collect();
    let event_types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();

    Ok(RecordBatch::try_new(
        Arc::new(item_event_schema()),
        vec![
            Arc::new(StringArray::from(request_ids)) as ArrayRef,
            Arc::new(StringArray::from(items)),
            Arc::new(Int64Array::from(positions)),
            Arc::new(StringArray::from(event_types)),
        ],
    )?)
}

pub fn events_from_batch(batch: &RecordBatch) -> Result<Vec<ItemEvent>> {
    check_version(batch)?;
    let request_ids = column::<StringArray>(batch, columns::REQUEST_ID, DataType::Utf8)?;
    let items = column::<StringArray>(batch, columns::ITEM, DataType::Utf8)?;
    let positions = column::<Int64Array>(batch, columns::POSITION, DataType::Int64)?;
    let event_types = column::<StringArray>(batch, columns::EVENT_TYPE, DataType::Utf8)?;

    (0..batch.num_rows())
        .map(|row| {
            let raw = required_i64(positions, row, columns::POSITION)?;
            let position =
                Position::try_from(raw).map_err(|source| TableError::InvalidValue {
                    column: columns::POSITION.to_string(),
                    row,
                    source,
                })?;
            Ok(ItemEvent {
                request_id: RequestId::from(required_str(request_ids, row, columns::REQUEST_ID)?),
                item: optional_str(items, row).map(ItemId::from),
                position,
                event_type: event_type_at(event_types, row)?,
            })
        })
        .collect()
}

// ── Aggregated table ────────────────────────────────────────────────────

pub fn aggregated_to_batch(rows: &[AggregatedItem]) -> Result<RecordBatch> {
    let items: Vec<&str> = rows.iter().map(|r| r.item.as_str()).collect();
    let clicks = rows
        .iter()
        .enumerate()
        .map(|(i, r)| count_to_i64(r.click, i, columns::CLICK))
        .collect::<Result<Vec<i64>>>()?;
    let impressions = rows
        .iter()
        .enumerate()
        .map(|(i, r)| count_to_i64(r.impress, i, columns::IMPRESS))
        .collect::<Result<Vec<i64>>>()?;

    Ok(RecordBatch::try_new(
        Arc::new(aggregated_schema()),
        vec![
            Arc::new(StringArray::from(items)) as ArrayRef,
            Arc::new(Int64Array::from(clicks)),
            Arc::new(Int64Array::from(impressions)),
        ],
    )?)
}

pub fn aggregated_from_batch(batch: &RecordBatch) -> Result<Vec<AggregatedItem>> {
    check_version(batch)?;
    let items = column::<StringArray>(batch, columns::ITEM, DataType::Utf8)?;
    let clicks = column::<Int64Array>(batch, columns::CLICK, DataType::Int64)?;
    let impressions = column::<Int64Array>(batch, columns::IMPRESS, DataType::Int64)?;

    (0..batch.num_rows())
        .map(|row| {
            let click = required_i64(clicks, row, columns::CLICK)?;
            let impress = required_i64(impressions, row, columns::IMPRESS)?;
            Ok(AggregatedItem {
                item: ItemId::from(required_str(items, row, columns::ITEM)?),
                click: count_from_i64(click, row, columns::CLICK)?,
                impress: count_from_i64(impress, row, columns::IMPRESS)?,
            })
        })
        .collect()
}

// ── Scoring tables ──────────────────────────────────────────────────────

pub fn scored_to_batch(rows: &[ScoredItem]) -> Result<RecordBatch> {
    let ids: Vec<&str> = rows.iter().map(|r| r.item_id.as_str()).collect();
    let ctrs: Vec<f64> = rows.iter().map(|r| r.expected_ctr).collect();

    Ok(RecordBatch::try_new(
        Arc::new(scored_schema()),
        vec![
            Arc::new(StringArray::from(ids)) as ArrayRef,
            Arc::new(Float64Array::from(ctrs)),
        ],
    )?)
}

pub fn scored_from_batch(batch: &RecordBatch) -> Result<Vec<ScoredItem>> {
    check_version(batch)?;
    let ids = column::<StringArray>(batch, columns::ITEM_ID, DataType::Utf8)?;
    let ctrs = column::<Float64Array>(batch, columns::EXPECTED_CTR, DataType::Float64)?;

    (0..batch.num_rows())
        .map(|row| {
            if ctrs.is_null(row) {
                return Err(TableError::NullValue {
                    column: columns::EXPECTED_CTR.to_string(),
                    row,
                });
            }
            Ok(ScoredItem {
                item_id: ItemId::from(required_str(ids, row, columns::ITEM_ID)?),
                expected_ctr: ctrs.value(row),
            })
        })
        .collect()
}

pub fn item_ids_to_batch(ids: &[ItemId]) -> Result<RecordBatch> {
    let values: Vec<&str> = ids.iter().map(ItemId::as_str).collect();
    Ok(RecordBatch::try_new(
        Arc::new(item_id_schema()),
        vec![Arc::new(StringArray::from(values)) as ArrayRef],
    )?)
}

pub fn item_ids_from_batch(batch: &RecordBatch) -> Result<Vec<ItemId>> {
    check_version(batch)?;
    let ids = column::<StringArray>(batch, columns::ITEM_ID, DataType::Utf8)?;
    (0..batch.num_rows())
        .map(|row| Ok(ItemId::from(required_str(ids, row, columns::ITEM_ID)?)))
        .collect()
}

/// Render batches as an ASCII table.
pub fn format_batches(batches: &[RecordBatch]) -> Result<String> {
    Ok(pretty_format_batches(batches)?.to_string())
}

// ── Tests ───────────────────────────────────────────────────────────────
