//! Filtered statistics dashboard.
//!
//! A [`StatsView`] narrows the roster by class and the ledger by date range,
//! then derives the dashboard figures from that selection only.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use attendance_core::models::{AttendanceRecord, AttendanceStatus, DateRangeKind, Student};
use attendance_core::time_utils::Clock;
use attendance_core::{Ledger, Roster};

use crate::aggregator::{
    AtRiskStudent, ChartPeriod, StatisticsAggregator, StudentAttendance, CRITICAL_THRESHOLD,
};

/// Class and date-range selection for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsFilter {
    /// `None` (or `"All"`) selects every class.
    pub class: Option<String>,
    pub range: DateRangeKind,
}

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub student_count: u32,
    pub days_recorded: u32,
    /// Percent over every selected record, Late at half credit.
    pub average_attendance: u32,
    /// Students with records whose rate is in the critical band.
    pub at_risk_count: u32,
}

/// Per-student row of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStats<'a> {
    pub student: &'a Student,
    pub attendance: StudentAttendance,
    pub rate: f64,
}

/// Roster and ledger narrowed to one [`StatsFilter`].
#[derive(Debug)]
pub struct StatsView<'a> {
    students: Vec<&'a Student>,
    dates: BTreeSet<NaiveDate>,
    ledger: &'a Ledger,
}

impl<'a> StatsView<'a> {
    pub fn build(
        roster: &'a Roster,
        ledger: &'a Ledger,
        filter: &StatsFilter,
        clock: &impl Clock,
    ) -> Self {
        let students = roster.in_class(filter.class.as_deref());
        let dates =
            StatisticsAggregator::filter_date_range(&ledger.all_dates(), filter.range, clock);
        tracing::debug!(
            students = students.len(),
            dates = dates.len(),
            range = filter.range.label(),
            "stats view built"
        );
        Self {
            students,
            dates,
            ledger,
        }
    }

    pub fn students(&self) -> &[&'a Student] {
        &self.students
    }

    pub fn dates(&self) -> &BTreeSet<NaiveDate> {
        &self.dates
    }

    fn is_selected(&self, name: &str) -> bool {
        self.students.iter().any(|s| s.name == name)
    }

    /// Selected students' records, by selected date. Dates where none of the
    /// selected students has a record are left out.
    pub fn attendance(&self) -> BTreeMap<NaiveDate, Vec<&'a AttendanceRecord>> {
        self.dates
            .iter()
            .filter_map(|date| {
                let records: Vec<&'a AttendanceRecord> = self
                    .ledger
                    .raw_records_for(*date)
                    .iter()
                    .filter(|r| self.is_selected(&r.student_name))
                    .collect();
                (!records.is_empty()).then_some((*date, records))
            })
            .collect()
    }

    pub fn summary(&self) -> StatsSummary {
        let attendance = self.attendance();

        let mut entries = 0u32;
        let mut credit = 0.0f64;
        for record in attendance.values().flatten() {
            entries += 1;
            credit += half_credit(record.status);
        }
        let average_attendance = if entries > 0 {
            (credit / f64::from(entries) * 100.0).round() as u32
        } else {
            0
        };

        let at_risk_count = self
            .student_stats()
            .iter()
            .filter(|s| s.attendance.total() > 0 && s.rate < CRITICAL_THRESHOLD)
            .count() as u32;

        StatsSummary {
            student_count: self.students.len() as u32,
            days_recorded: attendance.len() as u32,
            average_attendance,
            at_risk_count,
        }
    }

    /// One row per selected student, in roster order.
    pub fn student_stats(&self) -> Vec<StudentStats<'a>> {
        self.students
            .iter()
            .map(|&student| {
                let attendance =
                    StudentAttendance::collect(&student.name, &self.dates, self.ledger);
                StudentStats {
                    student,
                    rate: attendance.rate(),
                    attendance,
                }
            })
            .collect()
    }

    /// Selected students below `threshold`, worst first.
    pub fn at_risk(&self, threshold: f64) -> Vec<AtRiskStudent<'a>> {
        StatisticsAggregator::at_risk_students(
            self.students.iter().copied(),
            self.ledger,
            &self.dates,
            threshold,
        )
    }

    /// Daily attended share for the trend line within `period`.
    ///
    /// Each point is `(date, percent)` with Late at half credit, over the
    /// selected students' records on that date.
    pub fn trend(&self, period: ChartPeriod, clock: &impl Clock) -> Vec<(NaiveDate, u32)> {
        let attendance = self.attendance();
        let recorded: BTreeSet<NaiveDate> = attendance.keys().copied().collect();
        StatisticsAggregator::filter_chart_period(&recorded, period, clock)
            .into_iter()
            .filter_map(|date| {
                let records = attendance.get(&date)?;
                let credit: f64 = records.iter().map(|r| half_credit(r.status)).sum();
                let pct = (credit / records.len() as f64 * 100.0).round() as u32;
                Some((date, pct))
            })
            .collect()
    }
}

fn half_credit(status: AttendanceStatus) -> f64 {
    match status {
        AttendanceStatus::Present => 1.0,
        AttendanceStatus::Late => 0.5,
        AttendanceStatus::Absent => 0.0,
    }
}
