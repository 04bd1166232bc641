//! # sfpm
//!
//! Project-management reporting over a Salesforce org: work items, projects
//! and time entries turned into status, utilization and estimation reports.
//!
//! ## Modules
//!
//! - [`query`]: SOQL query builder and literal formatting
//! - [`records`]: relationship flattening of query results
//! - [`analytics`]: grouped aggregates, trends, pivots and estimates
//! - [`salesforce`]: the record source seam and its REST client
//! - [`reports`]: report composition over a record source
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sfpm::config::Config;
//! use sfpm::reports::{GroupDimension, Reporter};
//! use sfpm::salesforce::SalesforceClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let client = SalesforceClient::new(config.salesforce)?;
//!     let reporter = Reporter::new(client, config.reporting);
//!
//!     let report = reporter.estimate_accuracy(GroupDimension::Type).await?;
//!     println!("{}", report);
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod config;
pub mod query;
pub mod records;
pub mod reports;
pub mod salesforce;

// Re-export top-level types for convenience
pub use analytics::{
    Analysis, GroupedAggregation, Pivot, PivotTable, RatioStatistics, RollingTrend, WeeklyTrend,
};

pub use config::{Config, ConfigError, LoggingConfig, ReportingConfig, SalesforceConfig};

pub use query::{Direction, Operator, QueryBuilder, QueryError, QueryResult};

pub use records::{flatten, FlatRecord, Record};

pub use reports::{Report, ReportError, ReportResult, Reporter, Table};

pub use salesforce::{RecordSource, SalesforceClient, SalesforceError, SalesforceResult};
