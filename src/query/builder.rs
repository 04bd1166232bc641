//! Chainable SOQL query builder
//!
//! Infallible calls return the builder; calls that validate input return
//! `QueryResult<Self>` so a chain fails at the first bad argument:
//!
//! ```rust
//! use sfpm::query::QueryBuilder;
//!
//! # fn main() -> Result<(), sfpm::query::QueryError> {
//! let soql = QueryBuilder::new()
//!     .select(["Id", "Name"])
//!     .from_object("Work_Item__c")
//!     .filter("Status__c", "=", "Done")?
//!     .order_by("Due_Date__c", "ASC")?
//!     .limit(10)?
//!     .build()?;
//!
//! assert_eq!(
//!     soql,
//!     "SELECT Id, Name FROM Work_Item__c WHERE Status__c = 'Done' ORDER BY Due_Date__c ASC LIMIT 10"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Trust boundary
//!
//! [`QueryBuilder::filter_raw`] and [`QueryBuilder::filter_subquery`] embed
//! caller text verbatim. Never route untrusted input through them; use
//! [`QueryBuilder::filter`] for values, which are always escaped.

use super::ast::{Condition, Direction, Operator, OrderItem, Query};
use super::error::{QueryError, QueryResult};
use super::value::{Operand, Value};

/// Maximum LIMIT accepted by the query endpoint
pub const MAX_LIMIT: i64 = 50_000;

/// Maximum OFFSET accepted by the query endpoint
pub const MAX_OFFSET: i64 = 2_000;

/// Conversion into a list of field expressions
///
/// A single string is split on commas and trimmed; lists are taken as-is.
pub trait IntoFieldList {
    fn into_field_list(self) -> Vec<String>;
}

fn split_fields(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

impl IntoFieldList for &str {
    fn into_field_list(self) -> Vec<String> {
        split_fields(self)
    }
}

impl IntoFieldList for String {
    fn into_field_list(self) -> Vec<String> {
        split_fields(&self)
    }
}

impl IntoFieldList for &String {
    fn into_field_list(self) -> Vec<String> {
        split_fields(self)
    }
}

impl<S: AsRef<str>> IntoFieldList for Vec<S> {
    fn into_field_list(self) -> Vec<String> {
        self.iter().map(|f| f.as_ref().trim().to_string()).collect()
    }
}

impl<S: AsRef<str>> IntoFieldList for &[S] {
    fn into_field_list(self) -> Vec<String> {
        self.iter().map(|f| f.as_ref().trim().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> IntoFieldList for [S; N] {
    fn into_field_list(self) -> Vec<String> {
        self.iter().map(|f| f.as_ref().trim().to_string()).collect()
    }
}

/// Builder for SOQL queries
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    select: Vec<String>,
    from: Option<String>,
    conditions: Vec<Condition>,
    group_by: Vec<String>,
    having: Vec<String>,
    order_by: Vec<OrderItem>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl QueryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append fields to the SELECT clause
    pub fn select(mut self, fields: impl IntoFieldList) -> Self {
        self.select.extend(fields.into_field_list());
        self
    }

    /// Set the FROM object (last call wins)
    pub fn from_object(mut self, object: impl Into<String>) -> Self {
        self.from = Some(object.into());
        self
    }

    /// Add a WHERE condition
    ///
    /// `operator` is one of `=`, `!=`, `<`, `>`, `<=`, `>=`, `LIKE`, `IN`,
    /// `NOT IN` (case-insensitive). IN / NOT IN take a list; relative date
    /// literals such as `TODAY` or `LAST_N_DAYS:30` are emitted unquoted.
    pub fn filter(
        self,
        field: impl Into<String>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> QueryResult<Self> {
        let op: Operator = operator.parse()?;
        self.filter_op(field, op, value)
    }

    /// Add a WHERE condition with an already-typed operator
    pub fn filter_op(
        mut self,
        field: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> QueryResult<Self> {
        self.conditions.push(Condition::compare(field, op, value)?);
        Ok(self)
    }

    /// Add `field = NULL`
    pub fn filter_null(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::is_null(field));
        self
    }

    /// Add `field != NULL`
    pub fn filter_not_null(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::not_null(field));
        self
    }

    /// Add `field IN (...)`
    pub fn filter_in<T: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> QueryResult<Self> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter_op(field, Operator::In, values)
    }

    /// Add `field NOT IN (...)`
    pub fn filter_not_in<T: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> QueryResult<Self> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter_op(field, Operator::NotIn, values)
    }

    /// Add `field IN (subquery)` or `field NOT IN (subquery)`
    ///
    /// The subquery text is embedded unescaped.
    pub fn filter_subquery(
        mut self,
        field: impl Into<String>,
        operator: &str,
        subquery: impl Into<String>,
    ) -> QueryResult<Self> {
        let op: Operator = operator.parse()?;
        self.conditions.push(Condition::subquery(field, op, subquery)?);
        Ok(self)
    }

    /// Add a verbatim WHERE fragment, e.g. an OR group
    ///
    /// The text is embedded unescaped.
    pub fn filter_raw(mut self, clause: impl Into<String>) -> Self {
        self.conditions.push(Condition::raw(clause));
        self
    }

    /// Append fields to the GROUP BY clause
    pub fn group_by(mut self, fields: impl IntoFieldList) -> Self {
        self.group_by.extend(fields.into_field_list());
        self
    }

    /// Add a HAVING fragment (AND-joined with earlier ones)
    pub fn having(mut self, clause: impl Into<String>) -> Self {
        self.having.push(clause.into());
        self
    }

    /// Add an ORDER BY item; direction is `ASC` or `DESC`
    pub fn order_by(self, field: impl Into<String>, direction: &str) -> QueryResult<Self> {
        let direction: Direction = direction.parse()?;
        Ok(self.order_by_dir(field, direction))
    }

    /// Add an ORDER BY item with an already-typed direction
    pub fn order_by_dir(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderItem {
            field: field.into(),
            direction,
        });
        self
    }

    /// Set LIMIT; must be within 1..=50000
    pub fn limit(mut self, n: i64) -> QueryResult<Self> {
        if !(1..=MAX_LIMIT).contains(&n) {
            return Err(QueryError::OutOfRange {
                clause: "LIMIT",
                min: 1,
                max: MAX_LIMIT,
                value: n,
            });
        }
        self.limit = Some(n);
        Ok(self)
    }

    /// Set OFFSET; must be within 0..=2000
    pub fn offset(mut self, n: i64) -> QueryResult<Self> {
        if !(0..=MAX_OFFSET).contains(&n) {
            return Err(QueryError::OutOfRange {
                clause: "OFFSET",
                min: 0,
                max: MAX_OFFSET,
                value: n,
            });
        }
        self.offset = Some(n);
        Ok(self)
    }

    /// Validate clause presence and produce an immutable [`Query`]
    pub fn build_query(&self) -> QueryResult<Query> {
        if self.select.is_empty() {
            return Err(QueryError::MissingClause("SELECT"));
        }
        let from = match self.from.as_deref() {
            Some(from) if !from.trim().is_empty() => from.to_string(),
            _ => return Err(QueryError::MissingClause("FROM")),
        };

        Ok(Query {
            select: self.select.clone(),
            from,
            conditions: self.conditions.clone(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
        })
    }

    /// Render the SOQL string
    ///
    /// Rendering does not consume or change the builder.
    pub fn build(&self) -> QueryResult<String> {
        let soql = self.build_query()?.to_string();
        tracing::debug!(soql = %soql, "Built SOQL query");
        Ok(soql)
    }
}
