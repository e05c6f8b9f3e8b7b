use chrono::FixedOffset;
use std::collections::BTreeMap;

use super::derived::DerivedRecord;
use super::fields::{correlation_key, resolve_interval, FieldRoles};
use super::groups::{StageGroup, StageGroupTable};
use super::window::WindowFilter;
use crate::record::RawRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingCorrelationKey,
    UnresolvedInterval,
    OutsideWindow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingStats {
    pub accepted: u64,
    pub missing_key: u64,
    pub unresolved: u64,
    pub outside_window: u64,
}

impl GroupingStats {
    pub fn skipped(&self) -> u64 {
        self.missing_key + self.unresolved + self.outside_window
    }

    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingCorrelationKey => self.missing_key += 1,
            SkipReason::UnresolvedInterval => self.unresolved += 1,
            SkipReason::OutsideWindow => self.outside_window += 1,
        }
    }
}

/// All records for one correlation key, split by stage in first-encounter order.
#[derive(Debug, Clone, Default)]
pub struct CorrelationBucket {
    pub stages: Vec<(StageGroup, Vec<DerivedRecord>)>,
}

impl CorrelationBucket {
    fn push(&mut self, group: StageGroup, record: DerivedRecord) {
        match self.stages.iter_mut().find(|(existing, _)| *existing == group) {
            Some((_, records)) => records.push(record),
            None => self.stages.push((group, vec![record])),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &DerivedRecord> {
        self.stages.iter().flat_map(|(_, records)| records.iter())
    }
}

/// Single-pass, append-only bucketing of records by (correlation key, stage group).
pub struct CorrelationGrouper<'a> {
    groups: &'a StageGroupTable,
    roles: FieldRoles,
    filter: WindowFilter,
    offset: FixedOffset,
    buckets: BTreeMap<String, CorrelationBucket>,
    stats: GroupingStats,
}

impl<'a> CorrelationGrouper<'a> {
    pub fn new(
        groups: &'a StageGroupTable,
        roles: FieldRoles,
        filter: WindowFilter,
        offset: FixedOffset,
    ) -> Self {
        Self {
            groups,
            roles,
            filter,
            offset,
            buckets: BTreeMap::new(),
            stats: GroupingStats::default(),
        }
    }

    /// Offers one record from `collection`. Rejected records are counted, never surfaced.
    pub fn push(&mut self, collection: &str, record: &RawRecord) -> Result<(), SkipReason> {
        let result = self.bucket(collection, record);
        match result {
            Ok(()) => self.stats.accepted += 1,
            Err(reason) => self.stats.record_skip(reason),
        }
        result
    }

    fn bucket(&mut self, collection: &str, record: &RawRecord) -> Result<(), SkipReason> {
        let key = correlation_key(record).ok_or(SkipReason::MissingCorrelationKey)?;
        let resolved = resolve_interval(record, &self.roles).ok_or(SkipReason::UnresolvedInterval)?;
        if !self.filter.admits(resolved.start.millis(), &self.offset) {
            return Err(SkipReason::OutsideWindow);
        }
        let group = self.groups.classify(collection);
        let derived = DerivedRecord::derive(collection, group, record, resolved, &self.offset)
            .ok_or(SkipReason::UnresolvedInterval)?
            .with_sequence(self.stats.accepted);
        self.buckets.entry(key).or_default().push(group, derived);
        Ok(())
    }

    pub fn stats(&self) -> GroupingStats {
        self.stats
    }

    /// Buckets keyed by correlation id in ascending byte order.
    pub fn finish(self) -> (BTreeMap<String, CorrelationBucket>, GroupingStats) {
        (self.buckets, self.stats)
    }
}
