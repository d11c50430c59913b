use thiserror::Error;

/// Invalid caller-supplied arguments. Aggregation never substitutes a default
/// for a bad argument; it fails with one of these instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Invalid granularity '{value}'. Use hour, day, or week.")]
    UnknownGranularity { value: String },
    #[error("Bucket count must be > 0.")]
    ZeroBucketCount,
    #[error("Page size must be > 0.")]
    ZeroPageSize,
    #[error("Page number must be >= 1.")]
    ZeroPageNumber,
}

pub type Result<T> = std::result::Result<T, AggregationError>;
