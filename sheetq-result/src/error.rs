use std::{fmt, io};
use thiserror::Error;

/// Unified error type for all sheetq operations.
///
/// Every stage of a query (translation, execution against the data source and
/// materialization of rows) reports failures through this enum. All variants
/// except [`Error::Conversion`] are fatal for the query that raised them; a
/// conversion error can instead be collected on a record that opts into
/// tolerant conversion.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading a source file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error raised while decoding delimited text.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A query operator or query shape the translator cannot express.
    ///
    /// Raised for joins, grouping, set operations (union, intersect, except),
    /// `Contains`, `DefaultIfEmpty`, `OfType`, `Single`, `ThenBy` and
    /// `Distinct` over a whole record or row.
    #[error("unsupported query operator: {0}")]
    UnsupportedOperation(String),

    /// An expression node the value evaluator or predicate translator cannot
    /// interpret. The message names the node kind.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A filter, ordering or aggregate references a physical column that the
    /// worksheet does not contain.
    #[error(
        "'{column}' is not a valid column name. Valid column names are: '{}'",
        valid.join("', '")
    )]
    UnknownColumn { column: String, valid: Vec<String> },

    /// Strict mapping was requested and a column or a record field has no
    /// counterpart.
    #[error("{0}")]
    StrictMapping(String),

    /// A cell value could not be converted to the declared field type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A first/last style operator ran over an empty result.
    #[error("sequence contains no elements")]
    EmptySequence,

    /// Failure reported by the tabular data driver.
    ///
    /// Driver failures are never retried; they surface as-is for the query
    /// that triggered them.
    #[error("data source error: {0}")]
    DataSource(String),

    /// Invalid user input or API parameter.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Internal error indicating a bug or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create an unsupported-operation error for the named operator.
    #[inline]
    pub fn unsupported_operation(operator: impl Into<String>) -> Self {
        Error::UnsupportedOperation(operator.into())
    }

    /// Create an unsupported-expression error for the named node kind.
    #[inline]
    pub fn unsupported_expression(kind: impl fmt::Display) -> Self {
        Error::UnsupportedExpression(kind.to_string())
    }

    /// Create a data source error from any displayable driver error.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetq_result::Error;
    ///
    /// fn open() -> Result<(), Error> {
    ///     Err(Error::data_source("workbook is locked"))
    /// }
    ///
    /// let err = open().unwrap_err();
    /// assert!(matches!(err, Error::DataSource(msg) if msg.contains("locked")));
    /// ```
    #[inline]
    pub fn data_source<E: fmt::Display>(err: E) -> Self {
        Error::DataSource(err.to_string())
    }
}

/// A single cell that could not be coerced into a record field.
///
/// `row` is the zero-based index of the data row within the result set.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row {row}, column '{column}': cannot convert '{value}' to {target}: {reason}")]
pub struct ConversionError {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub target: &'static str,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_column_lists_valid_names() {
        let err = Error::UnknownColumn {
            column: "Boss".into(),
            valid: vec!["Name".into(), "CEO".into()],
        };
        assert_eq!(
            err.to_string(),
            "'Boss' is not a valid column name. Valid column names are: 'Name', 'CEO'"
        );
    }

    #[test]
    fn conversion_error_is_transparent() {
        let err: Error = ConversionError {
            row: 3,
            column: "EmployeeCount".into(),
            value: "many".into(),
            target: "i64",
            reason: "not a number".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "row 3, column 'EmployeeCount': cannot convert 'many' to i64: not a number"
        );
    }
}
