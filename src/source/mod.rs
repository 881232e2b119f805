//! Row sources feeding import sessions.

pub mod csv_file;
pub mod json_lines;
pub mod naming;

use thiserror::Error;

pub use csv_file::{CsvRecord, CsvSource, CsvSourceOptions};
pub use json_lines::{JsonLine, JsonLines};

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("input has no header row")]
    MissingHeader,
    #[error("line {line} is not valid UTF-8")]
    InvalidEncoding { line: u64 },
    #[error("invalid JSON on line {line}: {source}")]
    InvalidJson {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Errors confined to a single record, which `--ignore-errors` may skip.
    pub fn is_record_level(&self) -> bool {
        match self {
            SourceError::InvalidJson { .. } | SourceError::InvalidEncoding { .. } => true,
            SourceError::Csv(err) => !err.is_io_error(),
            SourceError::Io(_) | SourceError::MissingHeader => false,
        }
    }

    pub fn line(&self) -> Option<u64> {
        match self {
            SourceError::InvalidJson { line, .. } | SourceError::InvalidEncoding { line } => {
                Some(*line)
            }
            SourceError::Csv(err) => err.position().map(|position| position.line()),
            SourceError::Io(_) | SourceError::MissingHeader => None,
        }
    }
}
