use thiserror::Error;

/// Library-level error kinds. Mirrors the five error kinds named by the
/// counting/profiling core: I/O, malformed input, a missing required tag,
/// mismatched paired-end bookkeeping, and broken internal invariants.
#[derive(Error, Debug)]
pub enum GeneAbacusError {
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("format error: {0}")]
    FormatError(String),

    #[error("missing NH tag on read {0}")]
    MissingTag(String),

    #[error("mate name mismatch: {0} != {1}")]
    MateNameMismatch(String, String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<serde_json::Error> for GeneAbacusError {
    fn from(e: serde_json::Error) -> Self {
        GeneAbacusError::FormatError(e.to_string())
    }
}

impl From<csv::Error> for GeneAbacusError {
    fn from(e: csv::Error) -> Self {
        GeneAbacusError::FormatError(e.to_string())
    }
}

impl From<rust_htslib::errors::Error> for GeneAbacusError {
    fn from(e: rust_htslib::errors::Error) -> Self {
        GeneAbacusError::IoFailure(std::io::Error::other(e.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, GeneAbacusError>;
