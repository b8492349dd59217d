//! Schema versioning and table column names.

/// Current schema version for all tables and serialized records.
///
/// Follows semver: MAJOR.MINOR.PATCH
/// - MAJOR: Breaking changes (column removals, type changes)
/// - MINOR: Additive changes (new optional columns)
/// - PATCH: Bug fixes, documentation
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Column names shared by every table representation.
pub mod columns {
    pub const REQUEST_ID: &str = "request_id";
    pub const IMPRESSIONS: &str = "impressions";
    pub const IMPRESSIONS_VISIBLE: &str = "impressions_visible";
    pub const EVENT_ITEM: &str = "event_item";
    pub const EVENT_TYPE: &str = "event_type";
    pub const ITEM: &str = "item";
    pub const POSITION: &str = "position";
    pub const CLICK: &str = "click";
    pub const IMPRESS: &str = "impress";
    pub const ITEM_ID: &str = "item_id";
    pub const EXPECTED_CTR: &str = "expected_ctr";
}

/// Check if a schema version is compatible with current.
pub fn is_compatible(version: &str) -> bool {
    let major = |v: &str| {
        v.split('.')
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0)
    };

    major(SCHEMA_VERSION) == major(version)
}
