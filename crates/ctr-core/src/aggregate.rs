//! Item-event aggregation.
//!
//! Reshapes the item-event table into one row per item with its click and
//! impression counts. Counting is order-independent, and partial counts
//! over separate chunks merge into the same result as one pass.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use ctr_common::{AggregatedItem, EventType, ItemEvent, ItemId};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    click: u64,
    impress: u64,
}

impl Counts {
    fn bump(&mut self, event_type: EventType) {
        match event_type {
            EventType::Click => self.click += 1,
            EventType::Impress => self.impress += 1,
        }
    }
}

/// Running per-item click and impression counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCounts {
    counts: BTreeMap<ItemId, Counts>,
    skipped: u64,
}

impl EventCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one event. Events without an item are tallied as skipped.
    pub fn record(&mut self, event: &ItemEvent) {
        match &event.item {
            Some(item) => self
                .counts
                .entry(item.clone())
                .or_default()
                .bump(event.event_type),
            None => self.skipped += 1,
        }
    }

    /// Count every event of an iterator.
    pub fn extend<I>(&mut self, events: I)
    where
        I: IntoIterator,
        I::Item: Borrow<ItemEvent>,
    {
        for event in events {
            self.record(event.borrow());
        }
    }

    /// Add another chunk's counts into this one.
    pub fn merge(&mut self, other: EventCounts) {
        for (item, c) in other.counts {
            let entry = self.counts.entry(item).or_default();
            entry.click += c.click;
            entry.impress += c.impress;
        }
        self.skipped += other.skipped;
    }

    /// Number of distinct items seen.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Events dropped because they carried no item.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn get(&self, item: &ItemId) -> Option<AggregatedItem> {
        self.counts.get(item).map(|c| AggregatedItem {
            item: item.clone(),
            click: c.click,
            impress: c.impress,
        })
    }

    /// One row per item, ascending by item id.
    pub fn into_rows(self) -> Vec<AggregatedItem> {
        if self.skipped > 0 {
            debug!(skipped = self.skipped, "events without an item were not aggregated");
        }
        self.counts
            .into_iter()
            .map(|(item, c)| AggregatedItem {
                item,
                click: c.click,
                impress: c.impress,
            })
            .collect()
    }
}

/// Aggregate item events into per-item counts, ascending by item id.
///
/// An item seen in only one role still gets a row, with 0 for the other.
pub fn aggregate<I>(events: I) -> Vec<AggregatedItem>
where
    I: IntoIterator,
    I::Item: Borrow<ItemEvent>,
{
    let mut counts = EventCounts::new();
    counts.extend(events);
    counts.into_rows()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctr_common::{Position, RequestId};

    fn event(request: &str, item: &str, event_type: EventType) -> ItemEvent {
        ItemEvent {
            request_id: RequestId::from(request),
            item: Some(ItemId::from(item)),
            position: Position::from_index(0),
            event_type,
        }
    }

    fn row(item: &str, click: u64, impress: u64) -> AggregatedItem {
        AggregatedItem {
            item: ItemId::from(item),
            click,
            impress,
        }
    }

    #[test]
    fn counts_by_item_and_type() {
        let events = vec![
            event("r1", "i2", EventType::Impress),
            event("r1", "i1", EventType::Impress),
            event("r2", "i2", EventType::Impress),
            event("r2", "i2", EventType::Click),
        ];
        assert_eq!(aggregate(&events), vec![row("i1", 0, 1), row("i2", 1, 2)]);
    }

    #[test]
    fn click_only_item_keeps_zero_impressions() {
        let events = vec![event("r1", "i9", EventType::Click)];
        assert_eq!(aggregate(events), vec![row("i9", 1, 0)]);
    }

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(aggregate(Vec::<ItemEvent>::new()).is_empty());
    }

    #[test]
    fn itemless_events_are_skipped() {
        let mut orphan = event("r1", "x", EventType::Click);
        orphan.item = None;
        let mut counts = EventCounts::new();
        counts.extend([orphan, event("r1", "i1", EventType::Impress)]);
        assert_eq!(counts.skipped(), 1);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.into_rows(), vec![row("i1", 0, 1)]);
    }

    #[test]
    fn merge_matches_single_pass() {
        let events = vec![
            event("r1", "i1", EventType::Impress),
            event("r1", "i2", EventType::Impress),
            event("r2", "i1", EventType::Impress),
            event("r2", "i1", EventType::Click),
            event("r3", "i3", EventType::Impress),
        ];
        let mut left = EventCounts::new();
        left.extend(&events[..2]);
        let mut right = EventCounts::new();
        right.extend(&events[2..]);
        left.merge(right);
        assert_eq!(left.into_rows(), aggregate(&events));
    }

    #[test]
    fn get_returns_counts() {
        let mut counts = EventCounts::new();
        counts.record(&event("r1", "i1", EventType::Click));
        assert_eq!(counts.get(&ItemId::from("i1")), Some(row("i1", 1, 0)));
        assert_eq!(counts.get(&ItemId::from("i2")), None);
    }
}
