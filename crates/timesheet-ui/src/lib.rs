//! Terminal UI layer for the timesheet dashboard.
//!
//! Provides themes, the header and filter-bar components, the breakdown
//! table view, and the application event loop built on top of [`ratatui`].

pub mod app;
pub mod components;
pub mod table_view;
pub mod themes;

pub use timesheet_core as core;
