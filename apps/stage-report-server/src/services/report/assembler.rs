use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::derived::DerivedRecord;
use super::duration::TwoDecimals;
use super::groups::StageGroup;
use super::grouper::CorrelationBucket;
use crate::record::EpochMillis;

/// Output contract of the aggregated report. Fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportShape {
    #[default]
    Grouped,
    Flat,
}

impl ReportShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grouped => "grouped",
            Self::Flat => "flat",
        }
    }
}

impl FromStr for ReportShape {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "grouped" => Ok(Self::Grouped),
            "flat" | "flat-by-id" | "flat_by_id" => Ok(Self::Flat),
            other => Err(format!("unknown report shape {other:?} (expected grouped or flat)")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecords {
    pub group: StageGroup,
    pub records: Vec<DerivedRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupedEntry {
    pub lr_number: String,
    pub stages: Vec<StageRecords>,
    /// Sum of same-day clock-minute spans across every stage.
    pub total_duration: TwoDecimals,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlatInterval {
    pub collection: String,
    pub group: StageGroup,
    pub start: EpochMillis,
    pub end: EpochMillis,
    pub start_ist: String,
    pub end_ist: String,
    pub duration_minutes: TwoDecimals,
}

impl From<DerivedRecord> for FlatInterval {
    fn from(record: DerivedRecord) -> Self {
        Self {
            collection: record.collection,
            group: record.group,
            start: record.start,
            end: record.end,
            start_ist: record.start_ist,
            end_ist: record.end_ist,
            duration_minutes: record.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AggregatedReport {
    Grouped(Vec<GroupedEntry>),
    Flat(BTreeMap<String, Vec<FlatInterval>>),
}

impl AggregatedReport {
    pub fn len(&self) -> usize {
        match self {
            Self::Grouped(entries) => entries.len(),
            Self::Flat(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn assemble(shape: ReportShape, buckets: BTreeMap<String, CorrelationBucket>) -> AggregatedReport {
    match shape {
        ReportShape::Grouped => AggregatedReport::Grouped(assemble_grouped(buckets)),
        ReportShape::Flat => AggregatedReport::Flat(assemble_flat(buckets)),
    }
}

/// One entry per correlation key, ascending by key.
pub fn assemble_grouped(buckets: BTreeMap<String, CorrelationBucket>) -> Vec<GroupedEntry> {
    buckets
        .into_iter()
        .map(|(lr_number, bucket)| {
            let total: i64 = bucket.records().map(DerivedRecord::clock_span_minutes).sum();
            GroupedEntry {
                lr_number,
                stages: bucket
                    .stages
                    .into_iter()
                    .map(|(group, records)| StageRecords { group, records })
                    .collect(),
                total_duration: TwoDecimals(total as f64),
            }
        })
        .collect()
}

/// Intervals per correlation key, ordered by start. Equal starts keep encounter order.
pub fn assemble_flat(
    buckets: BTreeMap<String, CorrelationBucket>,
) -> BTreeMap<String, Vec<FlatInterval>> {
    buckets
        .into_iter()
        .map(|(key, bucket)| {
            let mut records: Vec<DerivedRecord> = bucket
                .stages
                .into_iter()
                .flat_map(|(_, records)| records)
                .collect();
            records.sort_by(|a, b| {
                a.start_millis()
                    .total_cmp(&b.start_millis())
                    .then_with(|| a.sequence().cmp(&b.sequence()))
            });
            (key, records.into_iter().map(FlatInterval::from).collect())
        })
        .collect()
}
