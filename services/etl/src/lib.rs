//! ETL core - normalizes the denormalized matchmaking demo CSV
//!
//! Stages run strictly in dependency order and hand explicit table values to
//! each other:
//!
//! ```text
//! raw::load -> extract::{players, maps, weapons} -> extract::matches
//!           -> extract::rounds -> normalize::events -> writer::write_all
//! ```
//!
//! Same input order = same surrogate ids. Nothing here touches the database.

pub mod error;
pub mod extract;
pub mod keymap;
pub mod normalize;
pub mod pipeline;
pub mod raw;
pub mod writer;

pub use error::{EtlError, Result};
pub use pipeline::{NormalizedTables, Summary};
