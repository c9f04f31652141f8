//! Shared foundation for Timesheet Dash.
//!
//! Holds the error type, the timesheet data model and label rules, number
//! formatting helpers and the command-line settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{Result, TimesheetError};
