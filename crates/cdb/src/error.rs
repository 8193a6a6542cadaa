use std::io;

use dump::DumpError;
use thiserror::Error;

/// Errors that can occur while reading or building a constant database.
#[derive(Debug, Error)]
pub enum CdbError {
    /// An underlying filesystem failure: missing file, permission denied,
    /// short read, failed write or rename.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The bytes were readable but violated the cdb layout or a size limit.
    #[error("invalid cdb format: {0}")]
    Format(String),

    /// Misuse of a handle, e.g. a lookup on a closed database.
    #[error("{0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, CdbError>;

impl From<DumpError> for CdbError {
    fn from(e: DumpError) -> Self {
        match e {
            DumpError::Io(e) => CdbError::Io(e),
            DumpError::Format(msg) => CdbError::Format(msg),
        }
    }
}
