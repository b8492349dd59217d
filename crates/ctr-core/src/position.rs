//! Click position resolution.

use ctr_common::{ItemId, Position};

/// Position of `click` within `impressions`.
///
/// Returns the 1-based rank of the first matching item, or
/// [`Position::UNRESOLVED`] when the click is absent, not in the list, or
/// the list is empty.
pub fn resolve_click_position(impressions: &[ItemId], click: Option<&ItemId>) -> Position {
    click
        .and_then(|target| impressions.iter().position(|item| item == target))
        .map(Position::from_index)
        .unwrap_or(Position::UNRESOLVED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(ids: &[&str]) -> Vec<ItemId> {
        ids.iter().map(|s| ItemId::from(*s)).collect()
    }

    #[test]
    fn first_item_is_position_one() {
        let imps = items(&["i1", "i2", "i3", "i4"]);
        let pos = resolve_click_position(&imps, Some(&ItemId::from("i1")));
        assert_eq!(pos.as_i64(), 1);
    }

    #[test]
    fn third_item_is_position_three() {
        let imps = items(&["i1", "i2", "i3", "i4"]);
        let pos = resolve_click_position(&imps, Some(&ItemId::from("i3")));
        assert_eq!(pos.as_i64(), 3);
    }

    #[test]
    fn missing_click_is_unresolved() {
        let imps = items(&["i1", "i2", "i3", "i4"]);
        assert_eq!(resolve_click_position(&imps, None), Position::UNRESOLVED);
    }

    #[test]
    fn foreign_click_is_unresolved() {
        let imps = items(&["i1", "i2", "i3", "i4"]);
        let pos = resolve_click_position(&imps, Some(&ItemId::from("NA")));
        assert_eq!(pos.as_i64(), -1);
    }

    #[test]
    fn empty_list_is_unresolved() {
        let pos = resolve_click_position(&[], Some(&ItemId::from("i1")));
        assert_eq!(pos, Position::UNRESOLVED);
    }

    #[test]
    fn first_duplicate_wins() {
        let imps = items(&["i2", "i1", "i2"]);
        let pos = resolve_click_position(&imps, Some(&ItemId::from("i2")));
        assert_eq!(pos.get(), Some(1));
    }
}
