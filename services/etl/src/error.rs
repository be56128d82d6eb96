//! Error type for the ETL stages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The source header lacks columns every stage depends on.
    #[error("source dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("{table}: surrogate id space exhausted")]
    IdOverflow { table: &'static str },
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;
