//! Bulk roster import from CSV.
//!
//! The first row is a header. Columns are located by name (`name`, `id`,
//! `class`, case-insensitive); only `name` is required.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use attendance_core::models::{Student, DEFAULT_CLASS};
use attendance_core::notifications::Notice;
use attendance_core::{AttendanceError, Result, Roster};

/// Outcome of parsing an import file against the current roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// New students, in file order, ready to append to the roster.
    pub added: Vec<Student>,
    /// Names skipped because they were already enrolled or repeated in the file.
    pub duplicates: Vec<String>,
}

impl ImportReport {
    /// Notice summarising the import for the user.
    pub fn notice(&self) -> Notice {
        if self.added.is_empty() {
            return if self.duplicates.is_empty() {
                Notice::warning("No valid student data found in CSV")
            } else {
                Notice::warning(format!(
                    "No new students added. {} duplicates found.",
                    self.duplicates.len()
                ))
            };
        }

        let mut message = format!("{} students imported successfully", self.added.len());
        if !self.duplicates.is_empty() {
            message.push_str(&format!(". {} duplicates skipped.", self.duplicates.len()));
        }
        Notice::success(message)
    }
}

struct Columns {
    name: usize,
    id: Option<usize>,
    class: Option<usize>,
}

impl Columns {
    fn locate(header: &StringRecord) -> Result<Self> {
        let find = |wanted: &str| header.iter().position(|h| h.eq_ignore_ascii_case(wanted));
        let name = find("name").ok_or_else(|| AttendanceError::MissingColumn("name".into()))?;
        Ok(Self {
            name,
            id: find("id"),
            class: find("class"),
        })
    }
}

/// Parse CSV rows from `reader` into new students for `roster`.
///
/// A file without at least one data row after the header is rejected with
/// [`AttendanceError::EmptyImport`]. Blank rows and rows without a name are
/// skipped. Without an `id` column, ids are generated (`S001`, ...); without a
/// `class` column, students get [`DEFAULT_CLASS`]. The roster itself is not modified.
pub fn import_students<R: Read>(reader: R, roster: &Roster) -> Result<ImportReport> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = rdr.records().peekable();
    let header = match rows.next() {
        Some(header) => header?,
        None => return Err(AttendanceError::EmptyImport),
    };
    if rows.peek().is_none() {
        return Err(AttendanceError::EmptyImport);
    }
    let columns = Columns::locate(&header)?;

    let mut report = ImportReport::default();
    let mut pending: HashSet<String> = HashSet::new();

    for row in rows {
        let row = row?;
        let name = row.get(columns.name).unwrap_or("");
        if name.is_empty() {
            continue;
        }

        if roster.contains(name) || pending.contains(name) {
            report.duplicates.push(name.to_string());
            continue;
        }

        let id = match columns.id {
            Some(idx) => row.get(idx).unwrap_or("").to_string(),
            None => roster.next_generated_id(report.added.len()),
        };
        let class = match columns.class {
            Some(idx) => row.get(idx).unwrap_or("").to_string(),
            None => DEFAULT_CLASS.to_string(),
        };

        pending.insert(name.to_string());
        report.added.push(Student::new(name, id, class));
    }

    tracing::debug!(
        added = report.added.len(),
        duplicates = report.duplicates.len(),
        "roster import parsed"
    );
    Ok(report)
}

/// [`import_students`] from a file on disk.
pub fn import_students_from_path(path: &Path, roster: &Roster) -> Result<ImportReport> {
    let file = File::open(path)?;
    import_students(file, roster)
}
