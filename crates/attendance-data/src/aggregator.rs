//! Attendance statistics over the ledger.
//!
//! Every function here is read-only and total: empty rosters, empty ledgers
//! and empty date ranges produce zero counts and empty lists, never errors.
//!
//! Two rates are computed and they weight Late differently:
//! the daily summary rate counts Late as attended (full credit), while the
//! per-student rate gives Late half credit.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use attendance_core::models::{AttendanceStatus, DateRangeKind, Student};
use attendance_core::time_utils::{month_start, previous_month_end, year_start, Clock};
use attendance_core::{Ledger, Roster};

/// Default at-risk threshold (percent).
pub const AT_RISK_THRESHOLD: f64 = 85.0;

/// Rate below which a student is in the critical band.
pub const CRITICAL_THRESHOLD: f64 = 75.0;

// ── DailySummary ──────────────────────────────────────────────────────────────

/// Counts for one date across the current roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    /// Roster size, not the number of records.
    pub total: u32,
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    /// `round(100 * (present + late) / total)`, `0` for an empty roster.
    pub rate_percent: u32,
}

impl DailySummary {
    /// Students on the roster with no record on the date.
    pub fn not_marked(&self) -> u32 {
        self.total
            .saturating_sub(self.present + self.late + self.absent)
    }
}

// ── StudentAttendance ─────────────────────────────────────────────────────────

/// One student's tally over a set of dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StudentAttendance {
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    /// Latest date marked Present or Late.
    pub last_present: Option<NaiveDate>,
}

impl StudentAttendance {
    /// Tally `student_name`'s records on each of `dates`.
    pub fn collect<'d>(
        student_name: &str,
        dates: impl IntoIterator<Item = &'d NaiveDate>,
        ledger: &Ledger,
    ) -> Self {
        let mut tally = Self::default();
        for date in dates {
            if let Some(status) = ledger.status_of(*date, student_name) {
                tally.add(*date, status);
            }
        }
        tally
    }

    fn add(&mut self, date: NaiveDate, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
        if status.is_attended() && self.last_present.map_or(true, |last| date > last) {
            self.last_present = Some(date);
        }
    }

    /// Number of dates with a record.
    pub fn total(&self) -> u32 {
        self.present + self.late + self.absent
    }

    /// `100 * (present + 0.5 * late) / total`, `0.0` with no records.
    pub fn rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (f64::from(self.present) + f64::from(self.late) * 0.5) / f64::from(total) * 100.0
    }
}

// ── RateBand ──────────────────────────────────────────────────────────────────

/// Colour band used when displaying a student's rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateBand {
    Low,
    Medium,
    High,
}

impl RateBand {
    pub fn classify(rate: f64) -> Self {
        if rate < CRITICAL_THRESHOLD {
            Self::Low
        } else if rate < AT_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }
}

// ── AtRiskStudent ─────────────────────────────────────────────────────────────

/// A student whose rate is below the at-risk threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskStudent<'a> {
    pub student: &'a Student,
    pub rate: f64,
    pub attendance: StudentAttendance,
}

impl AtRiskStudent<'_> {
    pub fn band(&self) -> RateBand {
        RateBand::classify(self.rate)
    }
}

// ── ChartPeriod ───────────────────────────────────────────────────────────────

/// Rolling windows for the attendance trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPeriod {
    Week,
    Month,
    Year,
    #[default]
    All,
}

impl ChartPeriod {
    fn lookback_days(&self) -> Option<u64> {
        match self {
            Self::Week => Some(7),
            Self::Month => Some(30),
            Self::Year => Some(365),
            Self::All => None,
        }
    }
}

// ── StatisticsAggregator ──────────────────────────────────────────────────────

/// Stateless helper deriving summary views from a roster and a ledger.
pub struct StatisticsAggregator;

impl StatisticsAggregator {
    /// Counts for `date`, ignoring records of students no longer enrolled.
    pub fn daily_summary(date: NaiveDate, roster: &Roster, ledger: &Ledger) -> DailySummary {
        let mut summary = DailySummary {
            total: roster.len() as u32,
            ..DailySummary::default()
        };

        for record in ledger.records_for(date, roster) {
            match record.status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Late => summary.late += 1,
                AttendanceStatus::Absent => summary.absent += 1,
            }
        }

        summary.rate_percent = rounded_percent(summary.present + summary.late, summary.total);
        summary
    }

    /// Half-credit-for-Late rate of `student_name` over `dates`.
    pub fn student_rate<'d>(
        student_name: &str,
        dates: impl IntoIterator<Item = &'d NaiveDate>,
        ledger: &Ledger,
    ) -> f64 {
        StudentAttendance::collect(student_name, dates, ledger).rate()
    }

    /// Subset of `all_dates` selected by `range`, resolved against `clock`.
    ///
    /// `LastMonth` is the whole previous calendar month. The other kinds only
    /// set a lower bound.
    pub fn filter_date_range(
        all_dates: &BTreeSet<NaiveDate>,
        range: DateRangeKind,
        clock: &impl Clock,
    ) -> BTreeSet<NaiveDate> {
        let today = clock.today();
        let (start, end) = match range {
            DateRangeKind::All => return all_dates.clone(),
            DateRangeKind::ThisMonth => (month_start(today, 0), None),
            DateRangeKind::LastMonth => (month_start(today, 1), Some(previous_month_end(today))),
            DateRangeKind::Last3Months => (month_start(today, 2), None),
            DateRangeKind::ThisYear => (year_start(today), None),
        };

        match end {
            Some(end) => all_dates.range(start..=end).copied().collect(),
            None => all_dates.range(start..).copied().collect(),
        }
    }

    /// Subset of `dates` inside the rolling `period` ending today.
    pub fn filter_chart_period(
        dates: &BTreeSet<NaiveDate>,
        period: ChartPeriod,
        clock: &impl Clock,
    ) -> BTreeSet<NaiveDate> {
        let Some(days) = period.lookback_days() else {
            return dates.clone();
        };
        let cutoff = clock
            .today()
            .checked_sub_days(Days::new(days))
            .unwrap_or(NaiveDate::MIN);
        dates.range(cutoff..).copied().collect()
    }

    /// Students below `threshold` who have at least one record in `dates`,
    /// worst rate first.
    ///
    /// Students without records are left out rather than counted as 0%.
    /// Equal rates keep the order of `students`.
    pub fn at_risk_students<'a>(
        students: impl IntoIterator<Item = &'a Student>,
        ledger: &Ledger,
        dates: &BTreeSet<NaiveDate>,
        threshold: f64,
    ) -> Vec<AtRiskStudent<'a>> {
        let mut at_risk: Vec<AtRiskStudent<'a>> = students
            .into_iter()
            .filter_map(|student| {
                let attendance = StudentAttendance::collect(&student.name, dates, ledger);
                let rate = attendance.rate();
                (attendance.total() > 0 && rate < threshold).then_some(AtRiskStudent {
                    student,
                    rate,
                    attendance,
                })
            })
            .collect();

        at_risk.sort_by(|a, b| a.rate.total_cmp(&b.rate));
        at_risk
    }
}

/// `round(100 * part / whole)` in integer arithmetic, halves rounding up.
pub(crate) fn rounded_percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part), u64::from(whole));
    ((200 * part + whole) / (2 * whole)) as u32
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::time_utils::{parse_date, FixedClock};
    use AttendanceStatus::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn roster(names: &[&str]) -> Roster {
        Roster::from_students(names.iter().map(|n| Student::new(*n, "", "")).collect())
    }

    fn dates(list: &[&str]) -> BTreeSet<NaiveDate> {
        list.iter().map(|s| d(s)).collect()
    }

    // ── daily_summary ─────────────────────────────────────────────────────────

    #[test]
    fn test_daily_summary_scenario() {
        let roster = roster(&["Alice", "Bob"]);
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Alice", Present).unwrap();
        ledger.upsert("2024-03-01", "Bob", Absent).unwrap();

        let summary = StatisticsAggregator::daily_summary(d("2024-03-01"), &roster, &ledger);
        assert_eq!(
            summary,
            DailySummary {
                total: 2,
                present: 1,
                late: 0,
                absent: 1,
                rate_percent: 50,
            }
        );
    }

    #[test]
    fn test_daily_summary_late_is_full_credit() {
        let roster = roster(&["Alice", "Bob", "Carol"]);
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Alice", Late).unwrap();
        ledger.upsert("2024-03-01", "Bob", Present).unwrap();

        let summary = StatisticsAggregator::daily_summary(d("2024-03-01"), &roster, &ledger);
        assert_eq!(summary.rate_percent, 67);
        assert_eq!(summary.not_marked(), 1);
    }

    #[test]
    fn test_daily_summary_no_records() {
        let roster = roster(&["Alice"]);
        let summary = StatisticsAggregator::daily_summary(d("2024-03-01"), &roster, &Ledger::new());
        assert_eq!(summary.present + summary.late + summary.absent, 0);
        assert_eq!(summary.rate_percent, 0);
    }

    #[test]
    fn test_daily_summary_empty_roster_is_zero() {
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Ghost", Present).unwrap();
        let summary = StatisticsAggregator::daily_summary(d("2024-03-01"), &Roster::new(), &ledger);
        assert_eq!(summary, DailySummary::default());
    }

    #[test]
    fn test_daily_summary_ignores_removed_students() {
        let roster = roster(&["Alice", "Bob"]);
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Alice", Present).unwrap();
        ledger.upsert("2024-03-01", "Bob", Present).unwrap();
        ledger.upsert("2024-03-01", "Ghost", Present).unwrap();

        let summary = StatisticsAggregator::daily_summary(d("2024-03-01"), &roster, &ledger);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.rate_percent, 100);
    }

    // ── student_rate ──────────────────────────────────────────────────────────

    #[test]
    fn test_student_rate_half_credit_for_late() {
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Carol", Present).unwrap();
        ledger.upsert("2024-03-02", "Carol", Late).unwrap();

        let range = ledger.all_dates();
        let rate = StatisticsAggregator::student_rate("Carol", &range, &ledger);
        assert!((rate - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_student_rate_zero_without_records() {
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Alice", Present).unwrap();
        let range = ledger.all_dates();
        assert_eq!(StatisticsAggregator::student_rate("Bob", &range, &ledger), 0.0);
        assert_eq!(
            StatisticsAggregator::student_rate("Alice", &BTreeSet::new(), &ledger),
            0.0
        );
    }

    #[test]
    fn test_student_rate_only_counts_dates_in_range() {
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Alice", Absent).unwrap();
        ledger.upsert("2024-03-02", "Alice", Present).unwrap();

        let range = dates(&["2024-03-02"]);
        assert_eq!(StatisticsAggregator::student_rate("Alice", &range, &ledger), 100.0);
    }

    #[test]
    fn test_rates_stay_within_bounds() {
        let roster = roster(&["A", "B", "C", "D"]);
        let mut ledger = Ledger::new();
        let statuses = [Present, Late, Absent];
        for day in 1..=28u32 {
            let date = format!("2024-02-{day:02}");
            for (i, s) in roster.iter().enumerate() {
                if (day as usize + i) % 4 != 0 {
                    let status = statuses[(day as usize * (i + 1)) % 3];
                    ledger.upsert(&date, &s.name, status).unwrap();
                }
            }
        }

        let all = ledger.all_dates();
        for date in &all {
            let pct = StatisticsAggregator::daily_summary(*date, &roster, &ledger).rate_percent;
            assert!(pct <= 100);
        }
        for s in &roster {
            let rate = StatisticsAggregator::student_rate(&s.name, &all, &ledger);
            assert!((0.0..=100.0).contains(&rate));
        }
    }

    // ── filter_date_range ─────────────────────────────────────────────────────

    fn sample_dates() -> BTreeSet<NaiveDate> {
        dates(&[
            "2023-12-15",
            "2024-01-31",
            "2024-02-01",
            "2024-02-29",
            "2024-03-01",
            "2024-03-20",
            "2024-04-02",
        ])
    }

    fn sample_in_range(range: DateRangeKind, clock: &FixedClock) -> BTreeSet<NaiveDate> {
        StatisticsAggregator::filter_date_range(&sample_dates(), range, clock)
    }

    #[test]
    fn test_filter_all_returns_everything() {
        let clock = FixedClock(d("2024-03-20"));
        let out = sample_in_range(DateRangeKind::All, &clock);
        assert_eq!(out, sample_dates());
    }

    #[test]
    fn test_filter_this_month_is_open_ended() {
        let clock = FixedClock(d("2024-03-20"));
        let out = sample_in_range(DateRangeKind::ThisMonth, &clock);
        assert_eq!(out, dates(&["2024-03-01", "2024-03-20", "2024-04-02"]));
    }

    #[test]
    fn test_filter_last_month_includes_last_day() {
        let clock = FixedClock(d("2024-03-20"));
        let out = sample_in_range(DateRangeKind::LastMonth, &clock);
        assert_eq!(out, dates(&["2024-02-01", "2024-02-29"]));
    }

    #[test]
    fn test_filter_last_month_across_year_boundary() {
        let clock = FixedClock(d("2024-01-10"));
        let out = sample_in_range(DateRangeKind::LastMonth, &clock);
        assert_eq!(out, dates(&["2023-12-15"]));
    }

    #[test]
    fn test_filter_last_3_months() {
        let clock = FixedClock(d("2024-03-20"));
        let out = sample_in_range(DateRangeKind::Last3Months, &clock);
        assert_eq!(out.len(), 6);
        assert!(!out.contains(&d("2023-12-15")));
        assert!(out.contains(&d("2024-01-31")));
    }

    #[test]
    fn test_filter_this_year() {
        let clock = FixedClock(d("2024-03-20"));
        let out = sample_in_range(DateRangeKind::ThisYear, &clock);
        assert_eq!(out.len(), 6);
        assert!(!out.contains(&d("2023-12-15")));
    }

    #[test]
    fn test_filter_empty_input() {
        let clock = FixedClock(d("2024-03-20"));
        for kind in [
            DateRangeKind::All,
            DateRangeKind::ThisMonth,
            DateRangeKind::LastMonth,
            DateRangeKind::Last3Months,
            DateRangeKind::ThisYear,
        ] {
            let out = StatisticsAggregator::filter_date_range(&BTreeSet::new(), kind, &clock);
            assert!(out.is_empty());
        }
    }

    #[test]
    fn test_filter_chart_period() {
        let clock = FixedClock(d("2024-03-20"));
        let sample = sample_dates();
        let week = StatisticsAggregator::filter_chart_period(&sample, ChartPeriod::Week, &clock);
        assert_eq!(week, dates(&["2024-03-20", "2024-04-02"]));
        let month = StatisticsAggregator::filter_chart_period(&sample, ChartPeriod::Month, &clock);
        assert_eq!(month, dates(&["2024-02-29", "2024-03-01", "2024-03-20", "2024-04-02"]));
        let all = StatisticsAggregator::filter_chart_period(&sample, ChartPeriod::All, &clock);
        assert_eq!(all.len(), 7);
    }

    // ── at_risk_students ──────────────────────────────────────────────────────

    #[test]
    fn test_at_risk_scenario_carol() {
        let roster = roster(&["Alice", "Carol"]);
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Carol", Present).unwrap();
        ledger.upsert("2024-03-02", "Carol", Late).unwrap();
        ledger.upsert("2024-03-01", "Alice", Present).unwrap();
        ledger.upsert("2024-03-02", "Alice", Present).unwrap();

        let range = ledger.all_dates();
        let at_risk =
            StatisticsAggregator::at_risk_students(&roster, &ledger, &range, AT_RISK_THRESHOLD);
        assert_eq!(at_risk.len(), 1);
        assert_eq!(at_risk[0].student.name, "Carol");
        assert!((at_risk[0].rate - 75.0).abs() < 1e-9);
        assert_eq!(at_risk[0].band(), RateBand::Medium);
    }

    #[test]
    fn test_at_risk_excludes_students_without_records() {
        let roster = roster(&["Alice", "Newcomer"]);
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Alice", Absent).unwrap();

        let range = ledger.all_dates();
        let at_risk =
            StatisticsAggregator::at_risk_students(&roster, &ledger, &range, AT_RISK_THRESHOLD);
        let names: Vec<&str> = at_risk.iter().map(|a| a.student.name.as_str()).collect();
        assert_eq!(names, vec!["Alice"]);
    }

    #[test]
    fn test_at_risk_sorted_worst_first() {
        let roster = roster(&["Mid", "Worst", "Fine", "Low"]);
        let mut ledger = Ledger::new();
        for (day, mid, worst, fine, low) in [
            ("2024-03-01", Present, Absent, Present, Late),
            ("2024-03-02", Late, Absent, Present, Absent),
            ("2024-03-03", Present, Late, Present, Present),
            ("2024-03-04", Present, Absent, Present, Absent),
        ] {
            ledger.upsert(day, "Mid", mid).unwrap();
            ledger.upsert(day, "Worst", worst).unwrap();
            ledger.upsert(day, "Fine", fine).unwrap();
            ledger.upsert(day, "Low", low).unwrap();
        }

        let range = ledger.all_dates();
        let at_risk =
            StatisticsAggregator::at_risk_students(&roster, &ledger, &range, AT_RISK_THRESHOLD);
        let names: Vec<&str> = at_risk.iter().map(|a| a.student.name.as_str()).collect();
        // Worst 12.5, Low 37.5, Mid 87.5 (not at risk), Fine 100.
        assert_eq!(names, vec!["Worst", "Low"]);
        assert_eq!(at_risk[0].band(), RateBand::Low);
    }

    #[test]
    fn test_at_risk_empty_roster() {
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Alice", Absent).unwrap();
        let roster = Roster::new();
        let at_risk = StatisticsAggregator::at_risk_students(
            &roster,
            &ledger,
            &ledger.all_dates(),
            AT_RISK_THRESHOLD,
        );
        assert!(at_risk.is_empty());
    }

    #[test]
    fn test_student_attendance_last_present() {
        let mut ledger = Ledger::new();
        ledger.upsert("2024-03-01", "Alice", Present).unwrap();
        ledger.upsert("2024-03-05", "Alice", Late).unwrap();
        ledger.upsert("2024-03-09", "Alice", Absent).unwrap();

        let tally = StudentAttendance::collect("Alice", &ledger.all_dates(), &ledger);
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.last_present, Some(d("2024-03-05")));
    }

    #[test]
    fn test_rounded_percent() {
        assert_eq!(rounded_percent(1, 2), 50);
        assert_eq!(rounded_percent(2, 3), 67);
        assert_eq!(rounded_percent(1, 8), 13);
        assert_eq!(rounded_percent(0, 0), 0);
        assert_eq!(rounded_percent(5, 5), 100);
    }

    #[test]
    fn test_rate_band_classify() {
        assert_eq!(RateBand::classify(50.0), RateBand::Low);
        assert_eq!(RateBand::classify(75.0), RateBand::Medium);
        assert_eq!(RateBand::classify(85.0), RateBand::High);
    }
}
