//! SOQL query structure
//!
//! Typed clause pieces that a [`QueryBuilder`](super::QueryBuilder) assembles
//! and a [`Query`] renders. Clause order is fixed by [`Query`]'s `Display`
//! impl, not by the order in which the builder was called:
//!
//! ```text
//! SELECT ... FROM ... [WHERE ...] [GROUP BY ...] [HAVING ...]
//! [ORDER BY ...] [LIMIT n] [OFFSET n]
//! ```

use super::error::{QueryError, QueryResult};
use super::value::Operand;
use std::fmt;
use std::str::FromStr;

/// Comparison operators accepted in WHERE conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
    /// `LIKE`
    Like,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    NotIn,
}

impl Operator {
    /// All operators, in the order they are listed in error messages
    pub const ALL: [Operator; 9] = [
        Self::Ne,
        Self::Lt,
        Self::Lte,
        Self::Eq,
        Self::Gt,
        Self::Gte,
        Self::In,
        Self::Like,
        Self::NotIn,
    ];

    /// SOQL spelling of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }

    /// Whether the operator takes a parenthesized list
    pub fn takes_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    fn valid_list() -> String {
        Self::ALL
            .iter()
            .map(|op| op.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    /// Case-insensitive; surrounding and repeated inner whitespace is ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| QueryError::InvalidOperator {
                operator: s.to_string(),
                valid: Self::valid_list(),
            })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(QueryError::InvalidDirection(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// A single WHERE condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field OP literal` or `field IN (literal, ...)`
    Compare {
        field: String,
        op: Operator,
        operand: Operand,
    },
    /// `field = NULL` / `field != NULL`
    Null { field: String, negated: bool },
    /// `field IN (subquery)`; the subquery text is embedded unescaped
    Subquery {
        field: String,
        op: Operator,
        subquery: String,
    },
    /// Verbatim fragment, for expressions the structured forms cannot model
    Raw(String),
}

impl Condition {
    /// Create a validated comparison
    ///
    /// IN / NOT IN require a list operand; every other operator requires a
    /// scalar.
    pub fn compare(
        field: impl Into<String>,
        op: Operator,
        operand: impl Into<Operand>,
    ) -> QueryResult<Self> {
        let operand = operand.into();
        if op.takes_list() && !operand.is_list() {
            return Err(QueryError::InvalidOperand(format!(
                "Operator '{}' requires a list of values",
                op
            )));
        }
        if !op.takes_list() && operand.is_list() {
            return Err(QueryError::InvalidOperand(format!(
                "Operator '{}' requires a single value, got a list",
                op
            )));
        }
        Ok(Self::Compare {
            field: field.into(),
            op,
            operand,
        })
    }

    /// Create a subquery condition; only IN / NOT IN are allowed
    pub fn subquery(
        field: impl Into<String>,
        op: Operator,
        subquery: impl Into<String>,
    ) -> QueryResult<Self> {
        if !op.takes_list() {
            return Err(QueryError::InvalidOperator {
                operator: op.to_string(),
                valid: "IN, NOT IN".to_string(),
            });
        }
        Ok(Self::Subquery {
            field: field.into(),
            op,
            subquery: subquery.into(),
        })
    }

    /// `field = NULL`
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::Null {
            field: field.into(),
            negated: false,
        }
    }

    /// `field != NULL`
    pub fn not_null(field: impl Into<String>) -> Self {
        Self::Null {
            field: field.into(),
            negated: true,
        }
    }

    /// Verbatim fragment
    pub fn raw(clause: impl Into<String>) -> Self {
        Self::Raw(clause.into())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { field, op, operand } => write!(f, "{} {} {}", field, op, operand),
            Self::Null { field, negated } => {
                write!(f, "{} {} NULL", field, if *negated { "!=" } else { "=" })
            }
            Self::Subquery {
                field,
                op,
                subquery,
            } => write!(f, "{} {} ({})", field, op, subquery),
            Self::Raw(clause) => f.write_str(clause),
        }
    }
}

/// An ORDER BY item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub field: String,
    pub direction: Direction,
}

impl fmt::Display for OrderItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

/// A validated query, ready to render
///
/// Only obtainable through [`QueryBuilder::build_query`](super::QueryBuilder::build_query),
/// which guarantees a non-empty projection and a source object.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub(crate) select: Vec<String>,
    pub(crate) from: String,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having: Vec<String>,
    pub(crate) order_by: Vec<OrderItem>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl Query {
    /// Projection fields
    pub fn select(&self) -> &[String] {
        &self.select
    }

    /// Queried object
    pub fn source(&self) -> &str {
        &self.from
    }

    /// WHERE conditions, AND-joined when rendered
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// GROUP BY fields
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// HAVING fragments
    pub fn having(&self) -> &[String] {
        &self.having
    }

    /// ORDER BY items
    pub fn order_by(&self) -> &[OrderItem] {
        &self.order_by
    }

    /// LIMIT, if set
    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    /// OFFSET, if set
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![
            format!("SELECT {}", self.select.join(", ")),
            format!("FROM {}", self.from),
        ];

        if !self.conditions.is_empty() {
            parts.push(format!("WHERE {}", join(&self.conditions, " AND ")));
        }
        if !self.group_by.is_empty() {
            parts.push(format!("GROUP BY {}", self.group_by.join(", ")));
        }
        if !self.having.is_empty() {
            parts.push(format!("HAVING {}", self.having.join(" AND ")));
        }
        if !self.order_by.is_empty() {
            parts.push(format!("ORDER BY {}", join(&self.order_by, ", ")));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            parts.push(format!("OFFSET {}", offset));
        }

        f.write_str(&parts.join(" "))
    }
}
