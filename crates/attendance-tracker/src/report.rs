//! Plain-text views printed by the command-line front end.
//!
//! Each `build_*_lines` function returns the lines to print, so the layout
//! can be tested without capturing stdout.

use chrono::NaiveDate;

use attendance_core::formatting::{
    format_days, format_display_date, format_filter_count, format_last_present, format_percent,
};
use attendance_core::models::{AttendanceStatus, DateRangeKind, Student};
use attendance_core::notifications::Notice;
use attendance_core::{Ledger, Roster};
use attendance_data::aggregator::{AtRiskStudent, DailySummary, RateBand, StudentAttendance};
use attendance_data::analysis::{StatsSummary, StudentStats};

const SEPARATOR_WIDTH: usize = 60;

fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

fn band_label(band: RateBand) -> &'static str {
    match band {
        RateBand::Low => "critical",
        RateBand::Medium => "warning",
        RateBand::High => "good",
    }
}

/// One line per notice, prefixed with its level.
pub fn build_notice_lines(notices: &[Notice]) -> Vec<String> {
    notices.iter().map(Notice::to_string).collect()
}

// ── Daily summary ─────────────────────────────────────────────────────────────

pub fn build_summary_lines(date: NaiveDate, summary: &DailySummary) -> Vec<String> {
    vec![
        format!("Attendance for {}", format_display_date(date)),
        separator(),
        format!("Total students: {}", summary.total),
        format!("Present:        {}", summary.present),
        format!("Late:           {}", summary.late),
        format!("Absent:         {}", summary.absent),
        format!("Not marked:     {}", summary.not_marked()),
        format!("Attendance:     {}%", summary.rate_percent),
    ]
}

// ── Student list ──────────────────────────────────────────────────────────────

/// Roster table with each student's status on `date`.
pub fn build_student_list_lines(
    students: &[&Student],
    roster: &Roster,
    ledger: &Ledger,
    date: NaiveDate,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(students.len() + 5);
    lines.push(format!(
        "Students on {} ({})",
        format_display_date(date),
        format_filter_count(students.len(), roster.len())
    ));
    let classes = roster.classes();
    if !classes.is_empty() {
        lines.push(format!("Classes: {}", classes.join(", ")));
    }
    lines.push(separator());
    lines.push(format!("{:<24} {:<8} {:<12} {}", "Name", "ID", "Class", "Status"));

    if students.is_empty() {
        lines.push("No students match the current filter.".to_string());
        return lines;
    }

    for student in students {
        let status = AttendanceStatus::label(ledger.status_of(date, &student.name));
        lines.push(format!(
            "{:<24} {:<8} {:<12} {}",
            student.name, student.id, student.class, status
        ));
    }
    lines
}

// ── Statistics dashboard ──────────────────────────────────────────────────────

/// Dashboard cards, the per-student table and the daily trend.
pub fn build_stats_lines(
    summary: &StatsSummary,
    rows: &[StudentStats<'_>],
    trend: &[(NaiveDate, u32)],
    class: Option<&str>,
    range: DateRangeKind,
) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Statistics: {} / {}",
            class.unwrap_or("All classes"),
            range.label()
        ),
        separator(),
        format!("Students:           {}", summary.student_count),
        format!("Days recorded:      {}", summary.days_recorded),
        format!("Average attendance: {}%", summary.average_attendance),
        format!("Critical students:  {}", summary.at_risk_count),
        String::new(),
        format!(
            "{:<24} {:>7} {:>5} {:>6} {:>6} {:>5}  {}",
            "Name", "Present", "Late", "Absent", "Total", "Rate", "Last present"
        ),
    ];

    for row in rows {
        let a = &row.attendance;
        lines.push(format!(
            "{:<24} {:>7} {:>5} {:>6} {:>6} {:>5}  {}",
            row.student.name,
            a.present,
            a.late,
            a.absent,
            a.total(),
            format_percent(row.rate),
            format_last_present(a.last_present)
        ));
    }

    if !trend.is_empty() {
        lines.push(String::new());
        lines.push("Trend (last 30 days)".to_string());
        for (date, pct) in trend {
            lines.push(format!("{:<14} {:>4}%", format_display_date(*date), pct));
        }
    }
    lines
}

// ── At-risk list ──────────────────────────────────────────────────────────────

pub fn build_at_risk_lines(at_risk: &[AtRiskStudent<'_>], threshold: f64) -> Vec<String> {
    let mut lines = vec![
        format!("Students below {}", format_percent(threshold)),
        separator(),
    ];

    if at_risk.is_empty() {
        lines.push("No students at risk.".to_string());
        return lines;
    }

    for entry in at_risk {
        lines.push(format!(
            "{:<24} {:<12} {:>5}  {:<8} (absent {}, late {})",
            entry.student.name,
            entry.student.class,
            format_percent(entry.rate),
            band_label(entry.band()),
            format_days(entry.attendance.absent),
            format_days(entry.attendance.late),
        ));
    }
    lines
}

// ── Student history ───────────────────────────────────────────────────────────

/// A student's record on each date in `dates` where they have one, newest first.
pub fn build_history_lines<'d>(
    student: &Student,
    ledger: &Ledger,
    dates: impl IntoIterator<Item = &'d NaiveDate>,
) -> Vec<String> {
    let dates: Vec<&NaiveDate> = dates.into_iter().collect();
    let attendance = StudentAttendance::collect(&student.name, dates.iter().copied(), ledger);

    let mut lines = vec![
        format!("{} ({}, {})", student.name, student.id, student.class),
        separator(),
        format!(
            "Present {} | Late {} | Absent {} | Rate {}",
            attendance.present,
            attendance.late,
            attendance.absent,
            format_percent(attendance.rate())
        ),
        format!("Last present: {}", format_last_present(attendance.last_present)),
        String::new(),
    ];

    let mut any = false;
    for date in dates.iter().rev() {
        if let Some(status) = ledger.status_of(**date, &student.name) {
            lines.push(format!("{:<14} {}", format_display_date(**date), status));
            any = true;
        }
    }
    if !any {
        lines.push("No attendance recorded.".to_string());
    }
    lines
}
