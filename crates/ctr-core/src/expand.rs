//! Log row → item-event expansion.
//!
//! A click row maps to exactly one click event. An impression row fans out
//! into one impress event per shown item. Both expansions are lazy
//! iterators over borrowed [`NormalizedLog`] views, so a batch is never
//! exploded into memory in one piece.
//!
//! Impression positions are scoped to the request id, not to the input row
//! or to the batch: if two rows share a request id, the second continues
//! where the first stopped, so each request's positions are `1..=k`
//! regardless of how rows from other requests are interleaved.

use std::collections::HashMap;

use ctr_common::{EventType, ItemEvent, Position, RequestId};

use crate::normalize::NormalizedLog;
use crate::position::resolve_click_position;

/// One click event per click row, in input order.
///
/// Non-click rows are passed over. A click whose target is missing or not
/// in the row's impression list gets [`Position::UNRESOLVED`].
pub fn expand_clicks<'a, I>(rows: I) -> impl Iterator<Item = ItemEvent> + 'a
where
    I: IntoIterator<Item = NormalizedLog<'a>>,
    I::IntoIter: 'a,
{
    rows.into_iter()
        .filter(NormalizedLog::is_click)
        .map(|row| ItemEvent {
            request_id: row.request_id.clone(),
            item: row.event_item.cloned(),
            position: resolve_click_position(row.impressions, row.event_item),
            event_type: EventType::Click,
        })
}

/// One impress event per impression of every row, regardless of the row's
/// own event type.
pub fn expand_impressions<'a, I>(rows: I) -> ImpressionEvents<'a, I::IntoIter>
where
    I: IntoIterator<Item = NormalizedLog<'a>>,
{
    ImpressionEvents {
        rows: rows.into_iter(),
        current: None,
        emitted: HashMap::new(),
    }
}

/// Row currently being expanded.
struct ActiveRow<'a> {
    row: NormalizedLog<'a>,
    next: usize,
    /// Impressions already emitted for this request by earlier rows.
    offset: usize,
}

/// Iterator returned by [`expand_impressions`].
pub struct ImpressionEvents<'a, I> {
    rows: I,
    current: Option<ActiveRow<'a>>,
    /// Impressions emitted so far per request id.
    emitted: HashMap<&'a RequestId, usize>,
}

impl<'a, I> ImpressionEvents<'a, I>
where
    I: Iterator<Item = NormalizedLog<'a>>,
{
    fn start_row(&mut self, row: NormalizedLog<'a>) {
        let seen = self.emitted.entry(row.request_id).or_insert(0);
        let offset = *seen;
        *seen += row.impressions.len();
        self.current = Some(ActiveRow {
            row,
            next: 0,
            offset,
        });
    }
}

impl<'a, I> Iterator for ImpressionEvents<'a, I>
where
    I: Iterator<Item = NormalizedLog<'a>>,
{
    type Item = ItemEvent;

    fn next(&mut self) -> Option<ItemEvent> {
        loop {
            if let Some(active) = self.current.as_mut() {
                if let Some(item) = active.row.impressions.get(active.next) {
                    let position = Position::from_index(active.offset + active.next);
                    active.next += 1;
                    return Some(ItemEvent {
                        request_id: active.row.request_id.clone(),
                        item: Some(item.clone()),
                        position,
                        event_type: EventType::Impress,
                    });
                }
                self.current = None;
            }

            let row = self.rows.next()?;
            self.start_row(row);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .current
            .as_ref()
            .map(|a| a.row.impressions.len() - a.next)
            .unwrap_or(0);
        (remaining, None)
    }
}
