//! Small line-oriented widgets shared by the dashboard views.

pub mod filter_bar;
pub mod header;
