//! Query builder error types
//!
//! Every error is terminal for a whole `build_queries` call: nothing here is
//! transient, so callers get the first failure and no partial query set.

use thiserror::Error;

/// Errors that can occur while building store queries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Filter item uses an operation the translator does not know
    #[error("Unsupported filter operation: {0}")]
    UnsupportedOperation(String),

    /// Filter value has a shape that cannot be rendered (empty, mixed or nested list)
    #[error("Unsupported filter value for label '{key}': {reason}")]
    UnsupportedFilterValue { key: String, reason: String },

    /// Aggregate operator has no SQL rendering (COUNT_DISTINCT)
    #[error("Unsupported aggregate operator: {0}")]
    UnsupportedAggregateOperator(String),

    /// Formula text could not be parsed
    #[error("Invalid expression '{formula}': {reason}")]
    ExpressionParse { formula: String, reason: String },

    /// Formula references a query name that was not supplied
    #[error("Formula '{formula}' references unknown query '{variable}'")]
    UnknownVariable { formula: String, variable: String },

    /// Two queries combined in one formula group by different labels
    #[error("Group by must be same: '{left}' groups by {left_tags:?}, '{right}' groups by {right_tags:?}")]
    GroupingMismatch {
        left: String,
        left_tags: Vec<String>,
        right: String,
        right_tags: Vec<String>,
    },
}

impl BuildError {
    pub(crate) fn parse(formula: &str, reason: impl Into<String>) -> Self {
        BuildError::ExpressionParse {
            formula: formula.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for query building
pub type BuildResult<T> = Result<T, BuildError>;
