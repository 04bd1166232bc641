//! SOQL Query Construction
//!
//! Builds SOQL strings from validated pieces:
//!
//! - **Value**: typed scalars and their literal tokens
//! - **AST**: operators, directions, conditions and the rendered [`Query`]
//! - **Builder**: the chainable [`QueryBuilder`]
//!
//! # Query Language
//!
//! ```text
//! SELECT field [, field2, ...]
//! FROM Object__c
//! [WHERE cond [AND cond ...]]
//! [GROUP BY field, ...]
//! [HAVING cond [AND cond ...]]
//! [ORDER BY field ASC|DESC, ...]
//! [LIMIT 1..50000]
//! [OFFSET 0..2000]
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use sfpm::query::QueryBuilder;
//!
//! let soql = QueryBuilder::new()
//!     .select("Id, Name, Status__c")
//!     .from_object("Work_Item__c")
//!     .filter("Status__c", "=", "In Progress")?
//!     .filter("Due_Date__c", "<=", "TODAY")?
//!     .order_by("Due_Date__c", "ASC")?
//!     .limit(50)?
//!     .build()?;
//! ```

mod ast;
mod builder;
mod error;
mod value;

pub use ast::{Condition, Direction, Operator, OrderItem, Query};
pub use builder::{IntoFieldList, QueryBuilder, MAX_LIMIT, MAX_OFFSET};
pub use error::{QueryError, QueryResult};
pub use value::{
    escape_string, format_value, is_date_literal, Operand, Value, DATE_LITERALS,
    DATE_LITERAL_PREFIXES,
};
