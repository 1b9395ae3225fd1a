//! Error types for mkkos.
//!
//! Library crates use [`MkKosError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all mkkos operations.
#[derive(Debug, thiserror::Error)]
pub enum MkKosError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A code string was not found in the configured code table.
    #[error("undefined code value: {code}")]
    UndefinedCode { code: String },

    /// The document was never started because no scanned instance carried
    /// all four required identifiers.
    #[error(
        "no instance supplied Study, Series, SOP Instance and SOP Class UIDs; \
         nothing to write"
    )]
    EmptyResult,

    /// The document has already been written and can no longer change.
    #[error("key object selection document already written")]
    Finalized,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error on a stream without a known path.
    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),

    /// Malformed DICOM input.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Transfer syntax that cannot be read or written.
    #[error("unsupported: {message}")]
    Unsupported { message: String },

    /// Data validation error (malformed UID, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MkKosError>;

impl MkKosError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an undefined-code error for the given code string.
    pub fn undefined_code(code: impl Into<String>) -> Self {
        Self::UndefinedCode { code: code.into() }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an unsupported-feature error from any displayable message.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error belongs to the configuration class (fatal before
    /// any instance is processed).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::UndefinedCode { .. })
    }
}
