use chrono::FixedOffset;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::duration::{StageDuration, TwoDecimals};
use super::fields::ResolvedFields;
use super::groups::StageGroup;
use crate::record::{EpochMillis, RawRecord};
use crate::time::{clock_minutes, format_local, instant_from_millis};

// Keys written by aggregation; same-named source fields are replaced.
const DERIVED_KEYS: &[&str] = &[
    "collection",
    "group",
    "start",
    "end",
    "start_ist",
    "end_ist",
    "duration_minutes",
    "duration_hours",
];

/// A source record with its resolved interval attached. The source fields ride along in
/// `extra` untouched.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedRecord {
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
    pub collection: String,
    pub group: StageGroup,
    pub start: EpochMillis,
    pub end: EpochMillis,
    pub start_ist: String,
    pub end_ist: String,
    pub duration_minutes: TwoDecimals,
    pub duration_hours: TwoDecimals,
    #[serde(skip)]
    start_clock_minutes: u32,
    #[serde(skip)]
    end_clock_minutes: u32,
    #[serde(skip)]
    sequence: u64,
}

impl DerivedRecord {
    /// Returns `None` when either end of the interval is not a representable instant.
    pub fn derive(
        collection: &str,
        group: StageGroup,
        record: &RawRecord,
        resolved: ResolvedFields,
        offset: &FixedOffset,
    ) -> Option<Self> {
        let start_at = instant_from_millis(resolved.start.millis())?;
        let end_at = instant_from_millis(resolved.end.millis())?;
        let duration = StageDuration::between(resolved.start.millis(), resolved.end.millis());

        let mut extra = record.0.clone();
        for key in DERIVED_KEYS {
            extra.remove(*key);
        }

        Some(Self {
            extra,
            collection: collection.to_string(),
            group,
            start: resolved.start,
            end: resolved.end,
            start_ist: format_local(start_at, offset),
            end_ist: format_local(end_at, offset),
            duration_minutes: duration.minutes,
            duration_hours: duration.hours,
            start_clock_minutes: clock_minutes(start_at, offset),
            end_clock_minutes: clock_minutes(end_at, offset),
            sequence: 0,
        })
    }

    /// Position of this record in the scan, used to break ties between equal starts.
    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn start_millis(&self) -> f64 {
        self.start.millis()
    }

    /// End clock minutes minus start clock minutes. Assumes both ends fall on the same
    /// local day; overnight intervals come out short or negative.
    pub fn clock_span_minutes(&self) -> i64 {
        i64::from(self.end_clock_minutes) - i64::from(self.start_clock_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::report::fields::{resolve_interval, FieldRoles};
    use crate::time::{report_offset, DEFAULT_REPORT_OFFSET_MINUTES};
    use serde_json::json;

    fn derive(record: &RawRecord) -> DerivedRecord {
        let offset = report_offset(DEFAULT_REPORT_OFFSET_MINUTES).expect("offset");
        let resolved = resolve_interval(record, &FieldRoles::aggregation()).expect("resolved");
        DerivedRecord::derive("lr_collection", StageGroup::Security, record, resolved, &offset)
            .expect("derived")
    }

    #[test]
    fn keeps_source_fields_and_adds_interval() {
        let record = RawRecord::new()
            .with("lr_number", "LR1")
            .with("vehicle", "KA01AB1234")
            .with("createdAt", 1000)
            .with("finalized", 61_000);
        let value = serde_json::to_value(derive(&record)).expect("serialize");

        assert_eq!(value["lr_number"], json!("LR1"));
        assert_eq!(value["vehicle"], json!("KA01AB1234"));
        assert_eq!(value["collection"], json!("lr_collection"));
        assert_eq!(value["group"], json!("Security"));
        assert_eq!(value["start"], json!(1000));
        assert_eq!(value["end"], json!(61_000));
        assert_eq!(value["start_ist"], json!("1/1/1970, 5:30:01 am"));
        assert_eq!(value["end_ist"], json!("1/1/1970, 5:31:01 am"));
        assert_eq!(value["duration_minutes"], json!("1.00"));
        assert_eq!(value["duration_hours"], json!("0.02"));
        assert!(value.get("start_clock_minutes").is_none());
    }

    #[test]
    fn derived_keys_replace_source_fields() {
        let record = RawRecord::new()
            .with("collection", "stale")
            .with("duration_minutes", 99)
            .with("finalized", 61_000);
        let value = serde_json::to_value(derive(&record)).expect("serialize");
        assert_eq!(value["collection"], json!("lr_collection"));
        assert_eq!(value["duration_minutes"], json!("0.00"));
        assert_eq!(value["start"], value["end"]);
    }

    #[test]
    fn clock_span_ignores_midnight() {
        // 23:50 IST to 00:10 IST the next day.
        let start = 1_760_725_200_000_i64; // 2025-10-17T18:20:00Z
        let end = start + 20 * 60_000;
        let record = RawRecord::new()
            .with("start_time", start)
            .with("finalized", end);
        let derived = derive(&record);
        assert_eq!(derived.duration_minutes.to_string(), "20.00");
        assert_eq!(derived.clock_span_minutes(), 10 - (23 * 60 + 50));
    }

    #[test]
    fn unrepresentable_instants_are_rejected() {
        let offset = report_offset(DEFAULT_REPORT_OFFSET_MINUTES).expect("offset");
        let record = RawRecord::new()
            .with("start_time", 1000)
            .with("finalized", 1.0e20);
        let resolved = resolve_interval(&record, &FieldRoles::aggregation()).expect("resolved");
        assert!(
            DerivedRecord::derive("audit", StageGroup::AuditTable, &record, resolved, &offset)
                .is_none()
        );
    }
}
