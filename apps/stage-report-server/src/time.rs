use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

/// India Standard Time, the civil offset the stage dashboards report in.
pub const DEFAULT_REPORT_OFFSET_MINUTES: i32 = 5 * 60 + 30;

pub fn report_offset(offset_minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(offset_minutes.checked_mul(60)?)
}

/// Converts a record timestamp to an instant. Fractional milliseconds are truncated.
pub(crate) fn instant_from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

pub(crate) fn local_to_utc(naive: NaiveDateTime, offset: &FixedOffset) -> DateTime<Utc> {
    (naive - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

pub(crate) fn local_midnight(date: NaiveDate, offset: &FixedOffset) -> DateTime<Utc> {
    local_to_utc(date.and_time(NaiveTime::MIN), offset)
}

pub(crate) fn local_date(instant: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    instant.with_timezone(offset).date_naive()
}

/// Minutes since local midnight, seconds dropped.
pub(crate) fn clock_minutes(instant: DateTime<Utc>, offset: &FixedOffset) -> u32 {
    let local = instant.with_timezone(offset);
    local.hour() * 60 + local.minute()
}

/// Renders `instant` the way the dashboard prints `en-IN` local times, e.g. `17/10/2026, 2:05:09 pm`.
pub(crate) fn format_local(instant: DateTime<Utc>, offset: &FixedOffset) -> String {
    instant
        .with_timezone(offset)
        .format("%-d/%-m/%Y, %-I:%M:%S %P")
        .to_string()
}
