//! Error types for reading, writing and plotting storage tables.

use thiserror::Error;

/// Errors that can occur while turning a storage source into a table.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage source cannot be located, opened or parsed.
    #[error("storage source unavailable: {origin}: {reason}")]
    SourceUnavailable {
        /// Where the source was expected to come from (path or description).
        origin: String,
        /// What went wrong.
        reason: String,
    },

    /// Label count, row count and time column length disagree.
    #[error("inconsistent length in {context}: expected {expected}, found {found}")]
    InconsistentLength {
        /// Which length was being checked.
        context: String,
        /// Length implied by the rest of the source.
        expected: usize,
        /// Length actually found.
        found: usize,
    },

    /// A row's own timestamp differs from the time column at that row.
    #[error("inconsistent time in row {row}: row reports {row_time}, time column has {column_time}")]
    InconsistentTime {
        /// 0-based row position.
        row: usize,
        /// Timestamp reported by the row itself.
        row_time: f64,
        /// Timestamp in the time column.
        column_time: f64,
    },

    /// A value cell is not numeric.
    #[error("unsupported value {token:?} on line {line}")]
    UnsupportedValue {
        /// 1-based line number in the source text.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// A column was requested by a name the table does not have.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// The charting backend failed, or there was nothing to draw.
    #[error("plot error: {0}")]
    Plot(String),

    /// A caller-supplied parameter is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl StorageError {
    /// Creates a source unavailable error.
    #[must_use]
    pub fn source_unavailable(origin: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an inconsistent length error.
    #[must_use]
    pub fn inconsistent_length(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::InconsistentLength {
            context: context.into(),
            expected,
            found,
        }
    }

    /// Creates an inconsistent time error.
    #[must_use]
    pub const fn inconsistent_time(row: usize, row_time: f64, column_time: f64) -> Self {
        Self::InconsistentTime {
            row,
            row_time,
            column_time,
        }
    }

    /// Creates an unsupported value error.
    #[must_use]
    pub fn unsupported_value(line: usize, token: impl Into<String>) -> Self {
        Self::UnsupportedValue {
            line,
            token: token.into(),
        }
    }

    /// Creates a plot error.
    #[must_use]
    pub fn plot(reason: impl ToString) -> Self {
        Self::Plot(reason.to_string())
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn source_unavailable_names_origin() {
        let err = StorageError::source_unavailable("state.sto", "No such file or directory");
        let msg = err.to_string();
        assert!(msg.contains("storage source unavailable"));
        assert!(msg.contains("state.sto"));
    }

    #[test]
    fn inconsistent_length_reports_both_counts() {
        let err = StorageError::inconsistent_length("time column", 3, 2);
        let msg = err.to_string();
        assert!(msg.contains("time column"));
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn inconsistent_time_reports_both_timestamps() {
        let err = StorageError::inconsistent_time(4, 0.25, 0.5);
        let msg = err.to_string();
        assert!(msg.contains("row 4"));
        assert!(msg.contains("0.25"));
        assert!(msg.contains("0.5"));
    }

    #[test]
    fn unsupported_value_quotes_token() {
        let err = StorageError::unsupported_value(8, "abc");
        assert_eq!(err.to_string(), "unsupported value \"abc\" on line 8");
    }
}
