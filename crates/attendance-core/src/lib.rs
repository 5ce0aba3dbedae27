//! Core domain layer for the attendance tracker.
//!
//! Holds the student [`roster::Roster`], the date-indexed
//! [`ledger::Ledger`] of attendance records, date and clock utilities,
//! user-facing notices, display formatting, CLI settings and the shared
//! error type.

pub mod error;
pub mod formatting;
pub mod ledger;
pub mod models;
pub mod notifications;
pub mod roster;
pub mod settings;
pub mod time_utils;

pub use error::{AttendanceError, Result};
pub use ledger::Ledger;
pub use models::{AttendanceRecord, AttendanceStatus, DateRangeKind, Student};
pub use roster::Roster;
