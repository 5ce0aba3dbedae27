//! Date-indexed attendance records.
//!
//! The [`Ledger`] maps each calendar date to the records taken that day and
//! guarantees that a `(date, student)` pair appears at most once: marking a
//! student again on the same date replaces the earlier status.
//!
//! Records are never validated against the roster on write. Readers that
//! need roster-consistent output go through [`Ledger::records_for`], which
//! drops records whose student has since been removed.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AttendanceError, Result};
use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::roster::Roster;
use crate::time_utils::parse_date;

/// Stored form of the ledger: date key → records, as held by the store.
pub type LedgerSnapshot = BTreeMap<String, Vec<AttendanceRecord>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Ledger {
    days: BTreeMap<NaiveDate, Vec<AttendanceRecord>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from a stored snapshot.
    ///
    /// Keys that are not valid dates are skipped. If a day lists the same
    /// student more than once, the last entry wins, matching the order in
    /// which marks were appended.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new();
        for (key, records) in snapshot {
            let date = match parse_date(&key) {
                Ok(date) => date,
                Err(_) => {
                    warn!(key = %key, "skipping attendance entry with invalid date key");
                    continue;
                }
            };
            for record in records {
                if record.student_name.is_empty() {
                    continue;
                }
                ledger.upsert_on(date, &record.student_name, record.status);
            }
        }
        ledger
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Record `status` for `student_name` on `date` (`YYYY-MM-DD`).
    ///
    /// Replaces any existing record for the same student and date. On a
    /// validation error the ledger is left untouched.
    pub fn upsert(
        &mut self,
        date: &str,
        student_name: &str,
        status: AttendanceStatus,
    ) -> Result<()> {
        if student_name.trim().is_empty() {
            return Err(AttendanceError::EmptyStudentName);
        }
        let date = parse_date(date)?;
        self.upsert_on(date, student_name, status);
        Ok(())
    }

    /// Typed variant of [`Ledger::upsert`] for callers holding a parsed date.
    pub fn upsert_on(&mut self, date: NaiveDate, student_name: &str, status: AttendanceStatus) {
        let records = self.days.entry(date).or_default();
        match records.iter_mut().find(|r| r.student_name == student_name) {
            Some(existing) => existing.status = status,
            None => records.push(AttendanceRecord::new(student_name, status)),
        }
        debug!(%date, student = student_name, %status, "attendance recorded");
    }

    /// Delete every record for `student_name`. Returns how many were removed.
    ///
    /// Idempotent; dates left with no records are dropped.
    pub fn remove_student(&mut self, student_name: &str) -> usize {
        let mut removed = 0;
        self.days.retain(|_, records| {
            let before = records.len();
            records.retain(|r| r.student_name != student_name);
            removed += before - records.len();
            !records.is_empty()
        });
        if removed > 0 {
            debug!(student = student_name, removed, "attendance records removed");
        }
        removed
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Records on `date` for students still on the roster.
    pub fn records_for(&self, date: NaiveDate, roster: &Roster) -> Vec<&AttendanceRecord> {
        self.raw_records_for(date)
            .iter()
            .filter(|r| roster.contains(&r.student_name))
            .collect()
    }

    /// Every record on `date`, including ones for removed students.
    pub fn raw_records_for(&self, date: NaiveDate) -> &[AttendanceRecord] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Status of `student_name` on `date`, `None` when not marked.
    pub fn status_of(&self, date: NaiveDate, student_name: &str) -> Option<AttendanceStatus> {
        self.raw_records_for(date)
            .iter()
            .find(|r| r.student_name == student_name)
            .map(|r| r.status)
    }

    /// All dates holding at least one record.
    pub fn all_dates(&self) -> BTreeSet<NaiveDate> {
        self.days
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(date, _)| *date)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.days.values().all(Vec::is_empty)
    }

    /// Total number of records across all dates.
    pub fn record_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }
}
