//! Runtime layer for the attendance tracker.
//!
//! Owns the live roster and ledger through [`session::AttendanceSession`]
//! and persists them to a [`store::DocumentStore`] after every change.

pub mod session;
pub mod store;

pub use attendance_core as core;
pub use attendance_data as data;
