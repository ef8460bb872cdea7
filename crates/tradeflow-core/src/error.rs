use thiserror::Error;

/// Record-level and configuration validation errors.
///
/// Record variants are recoverable: the offending line is dropped and the
/// pipeline keeps going.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("date must be a calendar date in YYYYMMDD format: '{value}'")]
    InvalidDate { value: String },

    #[error("product id must be a non-negative 64-bit integer: '{value}'")]
    InvalidProductId { value: String },

    #[error("price must be an exact decimal: '{value}'")]
    InvalidPrice { value: String },

    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("max in-flight batches must be greater than zero")]
    ZeroInFlight,
}

/// Failure of a single call against the product cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache storage error: {0}")]
    Storage(String),
}

/// Errors that end an enrichment run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading the input failed; no further lines are read.
    #[error("failed to read input near line {line}: {source}")]
    Source {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    /// A scheduled batch task panicked or was cancelled.
    #[error("batch {seq} worker failed: {message}")]
    Worker { seq: u64, message: String },
}

/// Errors raised while loading reference data into the cache.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read product input near line {line}: {source}")]
    Source {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
