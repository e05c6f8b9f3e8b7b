use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Timelike, Utc};
use std::str::FromStr;

use crate::time::{clock_minutes, instant_from_millis, local_date, local_midnight};

/// Absolute date range anchored to the evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarWindow {
    #[default]
    None,
    Day,
    Week,
    Month,
    PreviousMonth,
}

impl FromStr for CalendarWindow {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "previous-month" | "previous_month" | "prev-month" => Ok(Self::PreviousMonth),
            other => Err(format!(
                "Invalid filter '{other}'. Expected one of: none, day, week, month, previous-month"
            )),
        }
    }
}

/// Inclusive instant range, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

impl CalendarWindow {
    /// Range for this window in the report timezone, or `None` when unbounded.
    pub fn range(self, now: DateTime<Utc>, offset: &FixedOffset) -> Option<CalendarRange> {
        let today = local_date(now, offset);
        let start_of_month = today - Duration::days(i64::from(today.day0()));
        let start = match self {
            Self::None => return None,
            Self::Day => today,
            Self::Week => today - Duration::days(i64::from(today.weekday().num_days_from_sunday())),
            Self::Month => start_of_month,
            Self::PreviousMonth => {
                let last_of_previous = start_of_month - Duration::days(1);
                let start_of_previous =
                    last_of_previous - Duration::days(i64::from(last_of_previous.day0()));
                return Some(CalendarRange {
                    start: local_midnight(start_of_previous, offset),
                    end: local_midnight(start_of_month, offset) - Duration::milliseconds(1),
                });
            }
        };
        Some(CalendarRange {
            start: local_midnight(start, offset),
            end: now,
        })
    }
}

/// Time-of-day range in minutes since local midnight, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockWindow {
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl ClockWindow {
    /// Builds a window from two `HH:MM` bounds. Either bound missing disables the filter.
    pub fn from_bounds(start: Option<&str>, end: Option<&str>) -> Result<Option<Self>, String> {
        let start = start.map(str::trim).filter(|value| !value.is_empty());
        let end = end.map(str::trim).filter(|value| !value.is_empty());
        let (Some(start), Some(end)) = (start, end) else {
            return Ok(None);
        };
        Ok(Some(Self {
            start_minutes: parse_clock_minutes(start)?,
            end_minutes: parse_clock_minutes(end)?,
        }))
    }

    pub fn contains_minutes(&self, minutes: u32) -> bool {
        minutes >= self.start_minutes && minutes <= self.end_minutes
    }
}

/// Parses `HH:MM` (24h) into minutes since midnight.
pub fn parse_clock_minutes(raw: &str) -> Result<u32, String> {
    let invalid = || format!("Invalid time '{raw}'. Expected HH:MM");
    let trimmed = raw.trim();
    // chrono accepts single-digit minutes and signed fields, so pin the shape first.
    let (hours, minutes) = trimmed.split_once(':').ok_or_else(invalid)?;
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !(1..=2).contains(&hours.len()) || minutes.len() != 2 || !digits(hours) || !digits(minutes) {
        return Err(invalid());
    }
    let time = NaiveTime::parse_from_str(trimmed, "%H:%M").map_err(|_| invalid())?;
    Ok(time.hour() * 60 + time.minute())
}

/// The single window policy active for one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowFilter {
    #[default]
    All,
    Calendar(CalendarRange),
    Clock(ClockWindow),
}

impl WindowFilter {
    pub fn calendar(window: CalendarWindow, now: DateTime<Utc>, offset: &FixedOffset) -> Self {
        window
            .range(now, offset)
            .map_or(Self::All, Self::Calendar)
    }

    pub fn clock(window: Option<ClockWindow>) -> Self {
        window.map_or(Self::All, Self::Clock)
    }

    /// Whether a record whose resolved start is `start_millis` passes.
    pub fn admits(&self, start_millis: f64, offset: &FixedOffset) -> bool {
        match self {
            Self::All => true,
            Self::Calendar(range) => instant_from_millis(start_millis)
                .is_some_and(|instant| range.contains(instant)),
            Self::Clock(window) => instant_from_millis(start_millis)
                .is_some_and(|instant| window.contains_minutes(clock_minutes(instant, offset))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ist() -> FixedOffset {
        crate::time::report_offset(crate::time::DEFAULT_REPORT_OFFSET_MINUTES).expect("offset")
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("utc")
    }

    fn millis(instant: DateTime<Utc>) -> f64 {
        instant.timestamp_millis() as f64
    }

    #[test]
    fn parses_window_names() {
        assert_eq!("".parse::<CalendarWindow>(), Ok(CalendarWindow::None));
        assert_eq!("Day".parse::<CalendarWindow>(), Ok(CalendarWindow::Day));
        assert_eq!(
            "previous-month".parse::<CalendarWindow>(),
            Ok(CalendarWindow::PreviousMonth)
        );
        assert_eq!(
            "previous_month".parse::<CalendarWindow>(),
            Ok(CalendarWindow::PreviousMonth)
        );
        assert!("fortnight".parse::<CalendarWindow>().is_err());
        assert!("today".parse::<CalendarWindow>().is_err());
        assert!("all".parse::<CalendarWindow>().is_err());
    }

    #[test]
    fn day_window_starts_at_local_midnight() {
        // 2026-10-17 14:00 IST
        let now = utc(2026, 10, 17, 8, 30, 0);
        let filter = WindowFilter::calendar(CalendarWindow::Day, now, &ist());
        let midnight = utc(2026, 10, 16, 18, 30, 0);

        assert!(!filter.admits(millis(midnight) - 1.0, &ist()));
        assert!(filter.admits(millis(midnight), &ist()));
        assert!(filter.admits(millis(now), &ist()));
        assert!(!filter.admits(millis(now) + 1.0, &ist()));
    }

    #[test]
    fn week_window_starts_on_sunday() {
        // Saturday 2026-10-17 in IST; the week began Sunday 2026-10-11.
        let now = utc(2026, 10, 17, 8, 30, 0);
        let range = CalendarWindow::Week.range(now, &ist()).expect("range");
        assert_eq!(range.start, utc(2026, 10, 10, 18, 30, 0));
        assert_eq!(range.end, now);

        // On a Sunday the window starts that same midnight.
        let sunday = utc(2026, 10, 18, 6, 0, 0);
        let range = CalendarWindow::Week.range(sunday, &ist()).expect("range");
        assert_eq!(range.start, utc(2026, 10, 17, 18, 30, 0));
    }

    #[test]
    fn month_window_starts_on_the_first() {
        let now = utc(2026, 10, 17, 8, 30, 0);
        let range = CalendarWindow::Month.range(now, &ist()).expect("range");
        assert_eq!(range.start, utc(2026, 9, 30, 18, 30, 0));
        assert_eq!(range.end, now);
    }

    #[test]
    fn previous_month_covers_the_whole_month() {
        let now = utc(2026, 10, 17, 8, 30, 0);
        let range = CalendarWindow::PreviousMonth.range(now, &ist()).expect("range");
        assert_eq!(range.start, utc(2026, 8, 31, 18, 30, 0));
        assert_eq!(
            range.end,
            utc(2026, 9, 30, 18, 29, 59) + Duration::milliseconds(999)
        );

        // January rolls back into December of the previous year.
        let january = utc(2027, 1, 5, 12, 0, 0);
        let range = CalendarWindow::PreviousMonth
            .range(january, &ist())
            .expect("range");
        assert_eq!(range.start, utc(2026, 11, 30, 18, 30, 0));
        assert_eq!(range.end, utc(2026, 12, 31, 18, 29, 59) + Duration::milliseconds(999));
    }

    #[test]
    fn none_window_admits_everything() {
        let now = utc(2026, 10, 17, 8, 30, 0);
        assert_eq!(
            WindowFilter::calendar(CalendarWindow::None, now, &ist()),
            WindowFilter::All
        );
        assert!(WindowFilter::All.admits(-5.0, &ist()));
        assert!(WindowFilter::All.admits(1.0e20, &ist()));
    }

    #[test]
    fn clock_window_bounds_are_inclusive() -> Result<(), String> {
        let window = ClockWindow::from_bounds(Some("09:00"), Some("17:00"))?.expect("window");
        let filter = WindowFilter::clock(Some(window));
        // 03:29 UTC is 08:59 IST.
        assert!(!filter.admits(millis(utc(2026, 10, 17, 3, 29, 0)), &ist()));
        assert!(filter.admits(millis(utc(2026, 10, 17, 3, 30, 0)), &ist()));
        assert!(filter.admits(millis(utc(2026, 10, 17, 11, 30, 59)), &ist()));
        assert!(!filter.admits(millis(utc(2026, 10, 17, 11, 31, 0)), &ist()));
        Ok(())
    }

    #[test]
    fn clock_window_ignores_calendar_date() -> Result<(), String> {
        let window = ClockWindow::from_bounds(Some("09:00"), Some("17:00"))?.expect("window");
        let filter = WindowFilter::clock(Some(window));
        assert!(filter.admits(millis(utc(2019, 2, 3, 6, 0, 0)), &ist()));
        Ok(())
    }

    #[test]
    fn missing_clock_bound_disables_filter() -> Result<(), String> {
        assert_eq!(ClockWindow::from_bounds(Some("09:00"), None)?, None);
        assert_eq!(ClockWindow::from_bounds(None, Some("17:00"))?, None);
        assert_eq!(ClockWindow::from_bounds(Some(""), Some("17:00"))?, None);
        assert_eq!(WindowFilter::clock(None), WindowFilter::All);
        Ok(())
    }

    #[test]
    fn inverted_clock_window_matches_nothing() -> Result<(), String> {
        let window = ClockWindow::from_bounds(Some("22:00"), Some("02:00"))?.expect("window");
        assert!(!window.contains_minutes(23 * 60));
        assert!(!window.contains_minutes(60));
        Ok(())
    }

    #[test]
    fn rejects_malformed_clock_times() {
        assert_eq!(parse_clock_minutes("9:05"), Ok(545));
        assert_eq!(parse_clock_minutes("23:59"), Ok(1439));
        assert_eq!(parse_clock_minutes(" 00:00 "), Ok(0));
        assert!(parse_clock_minutes("24:00").is_err());
        assert!(parse_clock_minutes("12:60").is_err());
        assert!(parse_clock_minutes("12:5").is_err());
        assert!(parse_clock_minutes("noon").is_err());
        assert!(parse_clock_minutes(":30").is_err());
        assert!(parse_clock_minutes("+9:30").is_err());
        assert!(ClockWindow::from_bounds(Some("9am"), Some("17:00")).is_err());
    }
}
