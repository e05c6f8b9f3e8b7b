use serde_json::Value as JsonValue;

use crate::record::{EpochMillis, RawRecord};

/// Correlation id candidates, highest priority first.
pub const CORRELATION_KEY_FIELDS: &[&str] = &["lr_number", "lrNumber"];

const START_FIELDS: &[&str] = &[
    "start_time",
    "count_start_time",
    "cc_count_start",
    "start_count_time",
    "createdAt",
];

const END_FIELDS: &[&str] = &[
    "finalized",
    "finalize_time",
    "count_end_time",
    "cc_count_end",
    "updatedAt",
];

// Single-collection listings also honour the supervisor finalize stamp.
const LISTING_END_FIELDS: &[&str] = &[
    "finalized",
    "finalize_time",
    "sup_finalizeTime",
    "count_end_time",
    "cc_count_end",
    "updatedAt",
];

/// Ordered candidate fields for the start and end roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRoles {
    pub start: &'static [&'static str],
    pub end: &'static [&'static str],
}

impl FieldRoles {
    pub const fn aggregation() -> Self {
        Self {
            start: START_FIELDS,
            end: END_FIELDS,
        }
    }

    pub const fn collection_listing() -> Self {
        Self {
            start: START_FIELDS,
            end: LISTING_END_FIELDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFields {
    pub start_field: &'static str,
    pub end_field: &'static str,
    pub start: EpochMillis,
    pub end: EpochMillis,
}

impl ResolvedFields {
    /// True when no start-role field was present and the end value stands in for it.
    pub fn start_from_end(&self) -> bool {
        self.start_field == self.end_field
    }
}

/// First candidate whose value is present (truthy), with that value.
pub fn first_present<'r, 'c>(
    record: &'r RawRecord,
    candidates: &[&'c str],
) -> Option<(&'c str, &'r JsonValue)> {
    candidates
        .iter()
        .find_map(|field| record.present(field).map(|value| (*field, value)))
}

/// Picks the start/end pair for a record.
///
/// Once a candidate is selected its value must be numeric; a non-numeric value fails the
/// record instead of falling through to a lower-priority field. A missing start role
/// borrows the end value, giving a zero-length interval.
pub fn resolve_interval(record: &RawRecord, roles: &FieldRoles) -> Option<ResolvedFields> {
    let (end_field, end_value) = first_present(record, roles.end)?;
    let (start_field, start_value) =
        first_present(record, roles.start).unwrap_or((end_field, end_value));

    Some(ResolvedFields {
        start_field,
        end_field,
        start: EpochMillis::from_json(start_value)?,
        end: EpochMillis::from_json(end_value)?,
    })
}

/// Correlation id of a record. Numbers are rendered in decimal, as object keys would be.
pub fn correlation_key(record: &RawRecord) -> Option<String> {
    let (_, value) = first_present(record, CORRELATION_KEY_FIELDS)?;
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
