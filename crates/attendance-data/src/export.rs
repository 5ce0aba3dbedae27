//! CSV export of attendance and the student list.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use attendance_core::time_utils::format_date_key;
use attendance_core::{Ledger, Result, Roster};

#[derive(Serialize)]
struct AttendanceRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Class")]
    class: &'a str,
    #[serde(rename = "Status")]
    status: &'static str,
}

#[derive(Serialize)]
struct StudentRow<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Class")]
    class: &'a str,
}

/// Write one row per record on `dates`, dates ascending and students in
/// roster order. Records of students no longer enrolled are left out.
///
/// Returns the number of data rows written.
pub fn write_attendance_csv<W: Write>(
    writer: W,
    roster: &Roster,
    ledger: &Ledger,
    dates: &BTreeSet<NaiveDate>,
) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for date in dates {
        let key = format_date_key(*date);
        for student in roster {
            let Some(status) = ledger.status_of(*date, &student.name) else {
                continue;
            };
            wtr.serialize(AttendanceRow {
                date: key.clone(),
                name: &student.name,
                id: &student.id,
                class: &student.class,
                status: status.as_str(),
            })?;
            rows += 1;
        }
    }
    if rows == 0 {
        wtr.write_record(["Date", "Name", "ID", "Class", "Status"])?;
    }
    wtr.flush()?;
    Ok(rows)
}

/// Write the roster as `Name,ID,Class`. Returns the number of data rows.
pub fn write_students_csv<W: Write>(writer: W, roster: &Roster) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for student in roster {
        wtr.serialize(StudentRow {
            name: &student.name,
            id: &student.id,
            class: &student.class,
        })?;
    }
    if roster.is_empty() {
        wtr.write_record(["Name", "ID", "Class"])?;
    }
    wtr.flush()?;
    Ok(roster.len())
}

/// [`write_attendance_csv`] to a file, replacing it if present.
pub fn export_attendance_to_path(
    path: &Path,
    roster: &Roster,
    ledger: &Ledger,
    dates: &BTreeSet<NaiveDate>,
) -> Result<usize> {
    let file = File::create(path)?;
    write_attendance_csv(file, roster, ledger, dates)
}

/// [`write_students_csv`] to a file, replacing it if present.
pub fn export_students_to_path(path: &Path, roster: &Roster) -> Result<usize> {
    let file = File::create(path)?;
    write_students_csv(file, roster)
}
