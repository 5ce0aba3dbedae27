use std::sync::OnceLock;

use chrono::{Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::warn;

use crate::error::{AttendanceError, Result};

/// Storage and wire format for attendance dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Date parsing ──────────────────────────────────────────────────────────────

fn iso_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("regex is valid"))
}

/// Parse a strict `YYYY-MM-DD` date.
///
/// Chrono alone accepts unpadded fields such as `2024-3-1`; those would
/// produce ledger keys that differ from the ones the store already holds, so
/// the shape is checked first.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    if !iso_date_regex().is_match(trimmed) {
        return Err(AttendanceError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| AttendanceError::InvalidDate(s.to_string()))
}

/// Format a date as its ledger key.
pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// ── Calendar arithmetic ───────────────────────────────────────────────────────

/// First day of the month `months_back` months before `date`'s month.
pub fn month_start(date: NaiveDate, months_back: u32) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_sub_months(Months::new(months_back))
        .unwrap_or(NaiveDate::MIN)
}

/// Last day of the month before `date`'s month.
pub fn previous_month_end(date: NaiveDate) -> NaiveDate {
    month_start(date, 0)
        .pred_opt()
        .unwrap_or(NaiveDate::MIN)
}

/// January 1st of `date`'s year.
pub fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of the current calendar date.
///
/// Range filters are resolved against "today" at call time, so anything that
/// filters by date takes a clock rather than reading the system time itself.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in a fixed IANA timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    /// Create a clock for `tz_name`.
    ///
    /// If `tz_name` is not a recognised IANA timezone, falls back to UTC
    /// and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "SystemClock: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(&get_system_timezone())
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Validate that `tz_name` is a recognised IANA timezone identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}
