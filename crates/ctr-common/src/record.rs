//! Record types flowing through the pipeline.
//!
//! log row → item-event row → aggregated item → scored item.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::id::{ItemId, RequestId};

/// Kind of event a log row or item-event row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Items were shown to the user.
    Impress,
    /// The user selected one of the shown items.
    Click,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Impress => "impress",
            EventType::Click => "click",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "impress" => Ok(EventType::Impress),
            "click" => Ok(EventType::Click),
            other => Err(Error::UnknownEventType(other.to_string())),
        }
    }
}

/// 1-based rank of an item within an impression list.
///
/// Only `-1` and values `>= 1` are valid. `-1` marks a position that could
/// not be computed (click target missing or absent from the list). The value
/// serializes as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Position(i64);

impl Position {
    pub const UNRESOLVED: Position = Position(-1);

    /// Position of the element at zero-based `index`.
    pub fn from_index(index: usize) -> Self {
        Position(index as i64 + 1)
    }

    /// Raw integer value, `-1` when unresolved.
    pub fn as_i64(self) -> i64 {
        self.0
    }

    /// The 1-based rank, or `None` when unresolved.
    pub fn get(self) -> Option<u32> {
        if self.0 >= 1 {
            u32::try_from(self.0).ok()
        } else {
            None
        }
    }

    pub fn is_resolved(self) -> bool {
        self.0 >= 1
    }
}

impl TryFrom<i64> for Position {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == -1 || value >= 1 {
            Ok(Position(value))
        } else {
            Err(Error::InvalidPosition(value))
        }
    }
}

impl From<Position> for i64 {
    fn from(p: Position) -> Self {
        p.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One request-level log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub request_id: RequestId,
    /// Every item returned for the request, in rank order.
    pub impressions: Vec<ItemId>,
    /// Items actually rendered, when the client reported them.
    #[serde(default)]
    pub impressions_visible: Option<Vec<ItemId>>,
    /// Clicked item. Ignored for impress rows.
    #[serde(default)]
    pub event_item: Option<ItemId>,
    pub event_type: EventType,
}

impl LogRecord {
    /// An impress row without a visible-impressions override.
    pub fn impress<I, S>(request_id: &str, impressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        Self {
            request_id: RequestId::from(request_id),
            impressions: impressions.into_iter().map(Into::into).collect(),
            impressions_visible: None,
            event_item: None,
            event_type: EventType::Impress,
        }
    }

    /// A click row on `item` without a visible-impressions override.
    pub fn click<I, S>(request_id: &str, impressions: I, item: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        Self {
            request_id: RequestId::from(request_id),
            impressions: impressions.into_iter().map(Into::into).collect(),
            impressions_visible: None,
            event_item: Some(ItemId::from(item)),
            event_type: EventType::Click,
        }
    }

    /// Attach a visible-impressions override.
    pub fn with_visible<I, S>(mut self, visible: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        self.impressions_visible = Some(visible.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_click(&self) -> bool {
        self.event_type == EventType::Click
    }
}

/// One item-level event derived from a log row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemEvent {
    pub request_id: RequestId,
    /// `None` only for click rows whose log carried no clicked item.
    pub item: Option<ItemId>,
    pub position: Position,
    pub event_type: EventType,
}

/// Per-item impression and click counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedItem {
    pub item: ItemId,
    pub click: u64,
    pub impress: u64,
}

/// Batch scoring output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: ItemId,
    /// Historical CTR, or `-1.0` for items without history.
    pub expected_ctr: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_parse_and_display() {
        assert_eq!("impress".parse::<EventType>().unwrap(), EventType::Impress);
        assert_eq!("click".parse::<EventType>().unwrap(), EventType::Click);
        assert!("view".parse::<EventType>().is_err());
        assert_eq!(EventType::Click.to_string(), "click");
    }

    #[test]
    fn event_type_serde_matches_display() {
        let json = serde_json::to_string(&EventType::Impress).unwrap();
        assert_eq!(json, "\"impress\"");
    }

    #[test]
    fn position_valid_range() {
        assert!(Position::try_from(-1).is_ok());
        assert!(Position::try_from(1).is_ok());
        assert!(Position::try_from(0).is_err());
        assert!(Position::try_from(-2).is_err());
    }

    #[test]
    fn position_accessors() {
        assert_eq!(Position::from_index(0).as_i64(), 1);
        assert_eq!(Position::from_index(3).get(), Some(4));
        assert_eq!(Position::UNRESOLVED.get(), None);
        assert!(!Position::UNRESOLVED.is_resolved());
    }

    #[test]
    fn position_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Position::UNRESOLVED).unwrap(), "-1");
        let p: Position = serde_json::from_str("3").unwrap();
        assert_eq!(p.get(), Some(3));
        assert!(serde_json::from_str::<Position>("0").is_err());
    }

    #[test]
    fn log_record_json_defaults() {
        let json = r#"{"request_id":"r1","impressions":["i1","i2"],"event_type":"impress"}"#;
        let rec: LogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec, LogRecord::impress("r1", ["i1", "i2"]));
        assert!(rec.impressions_visible.is_none());
        assert!(!rec.is_click());
    }

    #[test]
    fn log_record_builders() {
        let rec = LogRecord::click("r2", ["i2", "i3"], "i3").with_visible(["i2"]);
        assert!(rec.is_click());
        assert_eq!(rec.event_item, Some(ItemId::from("i3")));
        assert_eq!(rec.impressions_visible.as_ref().map(Vec::len), Some(1));
    }
}
