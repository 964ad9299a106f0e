//! Error types for data parsing in nightscout-types.

use thiserror::Error;

/// Errors that can occur when interpreting Nightscout data.
///
/// This error type is transport-agnostic; HTTP errors belong in
/// nightscout-core.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// Timestamp could not be parsed.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Result type alias using nightscout-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
