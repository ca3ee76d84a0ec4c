//! Error types for trueno-bars operations.
//!
//! Only configuration problems and sink I/O are errors. Per-series data issues
//! (unavailable entities, non-numeric states) and malformed severity thresholds
//! degrade a single bar and never surface here.

use std::io;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or painting a bar card.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (config file reads, sink output, terminal setup).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration text could not be parsed.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed, 0 when unknown).
        line: usize,
        /// Parser message.
        message: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// The `entities` list is missing or empty.
    #[error("please define at least one entity")]
    NoEntities,

    /// A series entry has no entity identifier.
    #[error("entity #{index} has no entity identifier")]
    MissingEntity {
        /// Position of the offending entry in `entities`.
        index: usize,
    },
}

impl Error {
    /// Returns true for errors raised while validating a configuration.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. } | Self::ConfigNotFound(_) | Self::NoEntities | Self::MissingEntity { .. }
        )
    }
}
