//! Derived views over the attendance ledger.
//!
//! Computes daily summaries, per-student rates, date-range selections and
//! the at-risk list, builds the filtered statistics dashboard, and handles
//! CSV import of students and CSV export of attendance.

pub mod aggregator;
pub mod analysis;
pub mod export;
pub mod import;

pub use attendance_core as core;
