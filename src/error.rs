use std::io;

use mzdata::spectrum::bindata::ArrayRetrievalError;
use thiserror::Error;

/// Failures that stop an extraction run.
///
/// Running out of matching signal while growing a chromatogram is not an
/// error, it only ends growth in that direction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("An I/O error occurred: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to decode spectrum arrays: {0}")]
    ArrayRetrieval(#[from] ArrayRetrievalError),
    #[error("Invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Failed to read configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Failed to write report: {0}")]
    Report(#[from] csv::Error),
}
