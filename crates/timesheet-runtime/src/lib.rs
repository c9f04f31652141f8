//! Runtime layer for the timesheet dashboard.
//!
//! Owns the memoised view of the source file that the report, summary and
//! terminal dashboard all read from.

pub mod data_manager;

pub use timesheet_core as core;
pub use timesheet_data as data;
