//! User-facing notices.
//!
//! Every session operation reports its outcome as one or more [`Notice`]s
//! rather than failing the process. The presentation layer decides how to
//! show them; the levels match the four alert styles of the dashboard.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AttendanceError;

// ── NoticeLevel ───────────────────────────────────────────────────────────────

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Danger,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Notice ────────────────────────────────────────────────────────────────────

/// A non-fatal message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Danger, message)
    }

    /// Map an error to the notice shown for it.
    ///
    /// Problems the user can fix by retrying with different input are
    /// warnings; everything else is a danger notice.
    pub fn from_error(err: &AttendanceError) -> Self {
        match err {
            AttendanceError::DuplicateStudent(_) => Self::warning("Student already exists"),
            AttendanceError::StudentNotFound(name) => {
                Self::warning(format!("Student {name} not found"))
            }
            AttendanceError::StoreRead { key, .. } if key == "students" => {
                Self::warning("Error loading student data. Using default students.")
            }
            AttendanceError::StoreRead { key, .. } => {
                Self::warning(format!("Error loading {key} data. Using empty dataset."))
            }
            AttendanceError::StoreWrite { key, .. } => Self::danger(format!(
                "Error saving {} data. Please try again.",
                data_label(key)
            )),
            other => Self::danger(other.to_string()),
        }
    }
}

/// Singular wording for a store key in messages ("student data").
fn data_label(key: &str) -> &str {
    match key {
        "students" => "student",
        other => other,
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level.as_str().to_uppercase(), self.message)
    }
}
