//! Query error types
//!
//! Every builder call validates its own input, so these are raised at the
//! offending call rather than when the query is rendered.

use thiserror::Error;

/// Errors that can occur while building a SOQL query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Operator outside the fixed set of legal operators
    #[error("Invalid operator '{operator}'. Valid operators: {valid}")]
    InvalidOperator { operator: String, valid: String },

    /// Operand shape does not fit the operator (IN without a list, etc.)
    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    /// Ordering direction other than ASC/DESC
    #[error("Invalid order direction '{0}'. Use 'ASC' or 'DESC'")]
    InvalidDirection(String),

    /// LIMIT or OFFSET outside its bounds
    #[error("{clause} must be between {min} and {max}, got {value}")]
    OutOfRange {
        clause: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    /// A required clause was never set
    #[error("{0} clause is required")]
    MissingClause(&'static str),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
