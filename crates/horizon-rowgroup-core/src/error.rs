//! Error types for Horizon Rowgroup.

use thiserror::Error;

/// The main error type for Horizon Rowgroup operations.
///
/// Every failing operation aborts before mutating anything, so a caller that
/// receives an error can keep using the model as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowGroupError {
    /// An item with the same key (or the same instance) is already indexed.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// An item's key changed after it had been assigned.
    ///
    /// Keys may go from absent to present exactly once; after that they are
    /// immutable.
    #[error("key changed from {old} to {new} after it was assigned")]
    KeyChanged {
        /// Debug rendering of the key the item was indexed under.
        old: String,
        /// Debug rendering of the key the item now reports, or `none`.
        new: String,
    },

    /// The operation is not valid for the addressed row.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A flat row index is past the end of the model.
    #[error("row {row} is out of bounds (row count {row_count})")]
    RowOutOfBounds {
        /// The offending row.
        row: usize,
        /// The model's row count at the time of the call.
        row_count: usize,
    },

    /// A column index is past the end of the model.
    #[error("column {column} is out of bounds (column count {column_count})")]
    ColumnOutOfBounds {
        /// The offending column.
        column: usize,
        /// The model's column count.
        column_count: usize,
    },

    /// A group number is past the end of the model.
    #[error("group {group} is out of bounds (group count {group_count})")]
    GroupOutOfBounds {
        /// The offending group number.
        group: usize,
        /// The model's group count at the time of the call.
        group_count: usize,
    },

    /// The referenced group is not (or no longer) part of the model.
    #[error("group not found")]
    GroupNotFound,

    /// Column adapter sets of one model must all have the same cardinality.
    #[error("column set {set} has {found} columns, expected {expected}")]
    ColumnCountMismatch {
        /// Name of the offending set ("header" or "detail type N").
        set: String,
        /// The column count of the header set.
        expected: usize,
        /// The column count of the offending set.
        found: usize,
    },

    /// A column adapter rejected a read or write.
    #[error(transparent)]
    Column(#[from] ColumnError),
}

/// Errors reported by column adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    /// The column has no setter, or refused the edit for this row.
    #[error("column '{column}' is read-only")]
    ReadOnly {
        /// The column name.
        column: String,
    },

    /// The value handed to the setter has the wrong kind.
    #[error("column '{column}' expects {expected} values, got {found}")]
    TypeMismatch {
        /// The column name.
        column: String,
        /// The kind the column accepts.
        expected: &'static str,
        /// The kind that was supplied.
        found: &'static str,
    },

    /// The accessor itself failed.
    #[error("column '{column}' failed: {message}")]
    Failed {
        /// The column name.
        column: String,
        /// What went wrong.
        message: String,
    },
}

impl ColumnError {
    /// Convenience constructor for [`ColumnError::Failed`].
    pub fn failed(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            column: column.into(),
            message: message.into(),
        }
    }
}

/// A specialized Result type for Horizon Rowgroup operations.
pub type Result<T> = std::result::Result<T, RowGroupError>;
