//! Data layer for the timesheet dashboard.
//!
//! Reads the JSON timesheet export, aggregates and de-duplicates its rows,
//! computes filters and KPI metrics, and renders the chart / CSV / HTML
//! artifacts built on top of them.

pub mod aggregator;
pub mod analysis;
pub mod charts;
pub mod export;
pub mod reader;

pub use timesheet_core as core;
