use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::notifications::NoticeLevel;

/// Label shown for a student with no record on a date.
pub const NOT_MARKED: &str = "Not Marked";

/// Class assigned to imported students when the file has no `class` column.
pub const DEFAULT_CLASS: &str = "No Class";

/// A single enrolled student. `name` is the unique, case-sensitive key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub class: String,
}

impl Student {
    pub fn new(name: impl Into<String>, id: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            class: class.into(),
        }
    }
}

/// Attendance state recorded for one student on one date.
///
/// There is no "unmarked" variant: a missing record means the
/// student has not been marked, which is distinct from [`AttendanceStatus::Absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Late => "Late",
            Self::Absent => "Absent",
        }
    }

    /// Present and Late both count as attended.
    pub fn is_attended(&self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }

    /// Notice severity used when a student is marked with this status.
    pub fn notice_level(&self) -> NoticeLevel {
        match self {
            Self::Present => NoticeLevel::Success,
            Self::Late => NoticeLevel::Warning,
            Self::Absent => NoticeLevel::Danger,
        }
    }

    /// Display label for an optional status; `None` renders as [`NOT_MARKED`].
    pub fn label(status: Option<AttendanceStatus>) -> &'static str {
        status.map_or(NOT_MARKED, |s| s.as_str())
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Ok(Self::Present),
            "late" | "l" => Ok(Self::Late),
            "absent" | "a" => Ok(Self::Absent),
            other => Err(format!("unknown attendance status: {other}")),
        }
    }
}

/// One student's status on the date the record is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Stored as `name` to match the persisted document shape.
    #[serde(rename = "name")]
    pub student_name: String,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn new(student_name: impl Into<String>, status: AttendanceStatus) -> Self {
        Self {
            student_name: student_name.into(),
            status,
        }
    }
}

/// Fixed date-range selections offered by the statistics dashboard.
///
/// Resolved against "today" each time a view is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum DateRangeKind {
    #[default]
    All,
    ThisMonth,
    LastMonth,
    #[value(name = "last-3-months", alias = "last3-months")]
    Last3Months,
    ThisYear,
}

impl DateRangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All Time",
            Self::ThisMonth => "This Month",
            Self::LastMonth => "Last Month",
            Self::Last3Months => "Last 3 Months",
            Self::ThisYear => "This Year",
        }
    }
}
