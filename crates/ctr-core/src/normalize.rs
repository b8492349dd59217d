//! Impression list normalization.
//!
//! Clients may report which of the returned items were actually rendered
//! (`impressions_visible`). That override is trusted only when it is no
//! longer than the full impression list; anything longer is treated as
//! corrupt and ignored.
//!
//! The raw variant skips normalization and always uses the full list.

use ctr_common::{EventType, ItemId, LogRecord, RequestId};
use tracing::debug;

/// Pick the impression list to expand.
pub fn resolve_visible<'a>(
    impressions: &'a [ItemId],
    visible_override: Option<&'a [ItemId]>,
) -> &'a [ItemId] {
    match visible_override {
        Some(visible) if impressions.len() >= visible.len() => visible,
        _ => impressions,
    }
}

/// Borrowed view of a log row after impression selection.
///
/// Expansion works on views so neither variant copies impression lists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedLog<'a> {
    pub request_id: &'a RequestId,
    pub impressions: &'a [ItemId],
    pub event_item: Option<&'a ItemId>,
    pub event_type: EventType,
}

impl<'a> NormalizedLog<'a> {
    /// View using the full impression list, ignoring any override.
    pub fn raw(record: &'a LogRecord) -> Self {
        Self {
            request_id: &record.request_id,
            impressions: &record.impressions,
            event_item: record.event_item.as_ref(),
            event_type: record.event_type,
        }
    }

    /// View using the visible override when it is trustworthy. A rejected
    /// override is logged at debug.
    pub fn visible(record: &'a LogRecord) -> Self {
        log_rejected_override(record);
        Self::select_visible(record)
    }

    /// Same as [`NormalizedLog::visible`], without logging.
    pub(crate) fn select_visible(record: &'a LogRecord) -> Self {
        let visible = record.impressions_visible.as_deref();
        Self {
            request_id: &record.request_id,
            impressions: resolve_visible(&record.impressions, visible),
            event_item: record.event_item.as_ref(),
            event_type: record.event_type,
        }
    }

    pub fn is_click(&self) -> bool {
        self.event_type == EventType::Click
    }
}

fn log_rejected_override(record: &LogRecord) {
    if let Some(visible) = &record.impressions_visible {
        if visible.len() > record.impressions.len() {
            debug!(
                request_id = %record.request_id,
                impressions = record.impressions.len(),
                visible = visible.len(),
                "ignoring visible override longer than impression list"
            );
        }
    }
}

/// Owned normalization: replace the impression list with the resolved one
/// and drop the override.
pub fn normalize_record(mut record: LogRecord) -> LogRecord {
    log_rejected_override(&record);
    if let Some(visible) = record.impressions_visible.take() {
        if record.impressions.len() >= visible.len() {
            record.impressions = visible;
        }
    }
    record
}

/// Normalize every row of a log table.
pub fn normalize_records(records: Vec<LogRecord>) -> Vec<LogRecord> {
    records.into_iter().map(normalize_record).collect()
}
