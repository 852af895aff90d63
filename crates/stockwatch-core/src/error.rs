use std::path::PathBuf;

use thiserror::Error;

/// Validation errors for user-supplied symbols, rules and settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter or digit: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("threshold must be a positive finite number, got {value}")]
    InvalidThreshold { value: String },
    #[error("invalid rule for {symbol}: {reason}")]
    InvalidRule { symbol: String, reason: String },
    #[error("invalid direction '{value}', expected one of below, above")]
    InvalidDirection { value: String },
    #[error("duplicate rule for {symbol}")]
    DuplicateRule { symbol: String },

    #[error("invalid duration '{value}', expected forms like 90s, 10m, 1h30m")]
    InvalidDuration { value: String },
    #[error("invalid percentage '{value}', expected a non-negative number")]
    InvalidPercentage { value: String },
    #[error("invalid boolean '{value}', expected 1/0, true/false, yes/no or on/off")]
    InvalidBool { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
}

/// Errors raised while reading or writing the on-disk JSON files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("{} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
