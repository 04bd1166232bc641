//! Project-management reports
//!
//! [`Reporter`] composes the query builder, a [`RecordSource`], the
//! flattener and the analytics transforms into the reports the CLI exposes:
//!
//! - **Work items**: listing, time logging, status updates
//! - **Project**: status breakdown, overdue and blocked items, burn rate
//! - **Analytics**: estimate accuracy, utilization, velocity, scope, budget
//! - **Ad hoc**: raw SOQL, aggregate queries, object describe
//!
//! Every report is a serializable struct with a text rendering and a
//! primary [`Table`] for CSV output.

mod adhoc;
mod analytics;
mod project;
mod table;
mod work_items;

pub use adhoc::{AggregateFunction, AggregateReport, AggregateRequest, DescribeReport, QueryReport};
pub use analytics::{
    AccuracyBreakdown, DailyBudgetReport, EstimateAccuracyReport, GroupDimension, ScopeEstimate,
    ScopeEstimateReport, UtilizationBreakdown, UtilizationReport, VelocityReport,
};
pub use project::{ProjectSummary, StatusCount};
pub use table::{Table, EMPTY_CELL};
pub use work_items::{
    StatusChange, TimeEntryReceipt, TimeEntryRequest, WorkItemFilter, WorkItemList,
    WorkItemStatus,
};

use crate::config::ReportingConfig;
use crate::query::{QueryBuilder, QueryError};
use crate::records::FlatRecord;
use crate::salesforce::{RecordSource, SalesforceError};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Work item object
pub const WORK_ITEM_OBJECT: &str = "Work_Item__c";

/// Project object
pub const PROJECT_OBJECT: &str = "Project__c";

/// Time entry object
pub const TIME_ENTRY_OBJECT: &str = "Time_Entry__c";

/// Report output: serializable, printable, and tabular
pub trait Report: Serialize + fmt::Display {
    /// Primary rows of the report, used for CSV output
    fn table(&self) -> Table;
}

/// Errors raised by report operations
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error(transparent)]
    Salesforce(#[from] SalesforceError),

    #[error("Invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("{object} '{name}' not found")]
    NotFound { object: &'static str, name: String },
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Runs reports against a record source
pub struct Reporter<S> {
    source: S,
    config: ReportingConfig,
    today: Option<NaiveDate>,
}

impl<S: RecordSource> Reporter<S> {
    /// Create a reporter over a source
    pub fn new(source: S, config: ReportingConfig) -> Self {
        Self {
            source,
            config,
            today: None,
        }
    }

    /// Pin "today" instead of reading the local clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &ReportingConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Build, run and flatten a query
    async fn fetch(&self, builder: QueryBuilder) -> ReportResult<Vec<FlatRecord>> {
        let soql = builder.build()?;
        let rows = self.source.query_flat(&soql).await?;
        tracing::debug!(rows = rows.len(), "Fetched rows");
        Ok(rows)
    }

    /// Fetch at most one row
    async fn fetch_one(&self, builder: QueryBuilder) -> ReportResult<Option<FlatRecord>> {
        Ok(self.fetch(builder.limit(1)?).await?.into_iter().next())
    }
}

/// `LAST_N_DAYS` literal covering a number of weeks
fn last_n_weeks(weeks: u32) -> ReportResult<String> {
    if weeks == 0 {
        return Err(ReportError::Invalid {
            field: "weeks",
            message: "must be at least 1".to_string(),
        });
    }
    Ok(format!("LAST_N_DAYS:{}", u64::from(weeks) * 7))
}

/// Salesforce Id of a fetched record
fn record_id(record: &FlatRecord) -> ReportResult<&str> {
    record
        .get_str("Id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SalesforceError::Decode("record has no Id".to_string()).into())
}

/// Optional text rendered with a fallback
fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or("N/A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_n_weeks() {
        assert_eq!(last_n_weeks(2).unwrap(), "LAST_N_DAYS:14");
        assert!(matches!(
            last_n_weeks(0),
            Err(ReportError::Invalid { field: "weeks", .. })
        ));
    }

    #[test]
    fn test_record_id_requires_id() {
        let record = FlatRecord::new().with("Id", "a01xx0000001");
        assert_eq!(record_id(&record).unwrap(), "a01xx0000001");

        for record in [
            FlatRecord::new().with("Name", "WI-0001"),
            FlatRecord::new().with("Id", ""),
            FlatRecord::new().with("Id", serde_json::Value::Null),
        ] {
            assert!(matches!(
                record_id(&record),
                Err(ReportError::Salesforce(SalesforceError::Decode(_)))
            ));
        }
    }

    #[test]
    fn test_error_messages() {
        let err = ReportError::NotFound {
            object: "Work item",
            name: "WI-9999".into(),
        };
        assert_eq!(err.to_string(), "Work item 'WI-9999' not found");

        let err: ReportError = QueryError::MissingClause("FROM").into();
        assert!(err.to_string().starts_with("Query error:"));
    }
}
