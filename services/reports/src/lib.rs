//! Analytical reports over the loaded matchmaking database.
//!
//! [`queries`] runs the SQL, [`report`] holds the console/CSV form of a
//! result and [`chart`] rasterizes it.

pub mod chart;
pub mod queries;
pub mod report;

pub use report::Report;
