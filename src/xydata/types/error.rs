//! Custom error types for the xydata-reader crate.

use std::fmt;
use thiserror::Error;

/// Where in the input a format violation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Zero-based byte offset.
    Byte(u64),
    /// One-based line number.
    Line(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Location::Byte(offset) => write!(f, "byte offset {}", offset),
            Location::Line(line) => write!(f, "line {}", line),
        }
    }
}

fn describe_location(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!(" (at {})", loc),
        None => String::new(),
    }
}

/// The primary error type for all operations in this crate.
///
/// Variants fall into two groups. Format violations (`Format`,
/// `UnexpectedEof`, `ColumnLengthMismatch`) mean the input does not have the
/// structure of the format being decoded. Everything else is an operational
/// error: I/O, an unresolvable format request or a bad query index.
#[derive(Debug, Error)]
pub enum XyError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is structurally invalid for the format being decoded.
    #[error("{format}: {message}{}", describe_location(.location))]
    Format {
        format: &'static str,
        message: String,
        location: Option<Location>,
    },

    /// The input ended before a fixed-size record was complete.
    #[error("{format}: unexpected end of input at byte offset {offset}")]
    UnexpectedEof { format: &'static str, offset: u64 },

    /// A column's length disagrees with its siblings in the same block.
    #[error("column length mismatch: block has {expected} points, column has {found}")]
    ColumnLengthMismatch { expected: usize, found: usize },

    /// No registered format matches the request or the content.
    #[error("unknown or unsupported format: {0}")]
    UnknownFormat(String),

    /// A block, column or row index is outside the valid range.
    #[error("{what} index {index} out of range (count: {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A metadata key was requested that is not present.
    #[error("no such metadata key: {0}")]
    MissingKey(String),

    /// A mutex lock was poisoned, indicating a panic in another thread holding the lock.
    #[error("A mutex lock was poisoned, indicating a panic in another thread holding the lock.")]
    LockPoisoned,
}

impl XyError {
    /// Shorthand for a [`XyError::Format`] without a location.
    pub fn format(format: &'static str, message: impl Into<String>) -> Self {
        XyError::Format {
            format,
            message: message.into(),
            location: None,
        }
    }

    /// Attaches a location to a format violation. Other variants are returned unchanged.
    pub fn at(self, loc: Location) -> Self {
        match self {
            XyError::Format { format, message, .. } => XyError::Format {
                format,
                message,
                location: Some(loc),
            },
            other => other,
        }
    }

    /// True if the input did not match the expected structure, as opposed
    /// to an operational failure.
    pub fn is_format_violation(&self) -> bool {
        matches!(
            self,
            XyError::Format { .. }
                | XyError::UnexpectedEof { .. }
                | XyError::ColumnLengthMismatch { .. }
        )
    }
}

/// A convenience `Result` type alias using the crate's `XyError` type.
pub type Result<T> = std::result::Result<T, XyError>;
