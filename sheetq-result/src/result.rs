use crate::error::Error;

/// Result type alias used throughout sheetq.
pub type Result<T> = std::result::Result<T, Error>;
