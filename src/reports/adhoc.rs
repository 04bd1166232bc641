//! Ad hoc reports: raw SOQL, aggregate queries and object describe

use super::table::Table;
use super::{Report, ReportError, ReportResult, Reporter};
use crate::query::QueryBuilder;
use crate::records::FlatRecord;
use crate::salesforce::{ObjectDescription, RecordSource};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Result of an arbitrary SOQL query
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    /// Records returned by the org
    pub total: usize,
    /// Records kept for display
    pub rows: Vec<FlatRecord>,
}

impl QueryReport {
    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.total
    }
}

impl fmt::Display for QueryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())?;
        if self.is_truncated() {
            write!(
                f,
                "\n(Showing first {} of {} records)",
                self.rows.len(),
                self.total
            )?;
        }
        Ok(())
    }
}

impl Report for QueryReport {
    fn table(&self) -> Table {
        Table::from_records(&self.rows)
    }
}

/// SOQL aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub const ALL: [AggregateFunction; 5] =
        [Self::Avg, Self::Count, Self::Max, Self::Min, Self::Sum];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

impl FromStr for AggregateFunction {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == upper)
            .ok_or_else(|| ReportError::Invalid {
                field: "aggregate function",
                message: format!(
                    "'{}'. Valid options: {}",
                    s,
                    Self::ALL.map(|f| f.as_str()).join(", ")
                ),
            })
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of an aggregate query
#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub object: String,
    pub function: AggregateFunction,
    /// Aggregated field; optional for COUNT only
    pub field: Option<String>,
    pub group_by: Option<String>,
    /// WHERE text without the keyword
    pub filter: Option<String>,
}

impl AggregateRequest {
    pub fn new(object: impl Into<String>, function: AggregateFunction) -> Self {
        Self {
            object: object.into(),
            function,
            field: None,
            group_by: None,
            filter: None,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    pub fn filter(mut self, clause: impl Into<String>) -> Self {
        self.filter = Some(clause.into());
        self
    }

    /// Aggregate expression with its alias
    fn expression(&self) -> ReportResult<String> {
        let field = self.field.as_deref().map(str::trim).filter(|f| !f.is_empty());
        match (self.function, field) {
            (AggregateFunction::Count, None) => Ok("COUNT(Id) record_count".to_string()),
            (AggregateFunction::Count, Some(field)) => Ok(format!("COUNT({}) field_count", field)),
            (function, Some(field)) => Ok(format!("{}({}) result", function, field)),
            (function, None) => Err(ReportError::Invalid {
                field: "field",
                message: format!("required for {}", function),
            }),
        }
    }

    fn to_builder(&self) -> ReportResult<QueryBuilder> {
        let mut builder = QueryBuilder::new();
        let group_by = self.group_by.as_deref().filter(|g| !g.trim().is_empty());
        if let Some(group_by) = group_by {
            builder = builder.select(group_by);
        }
        builder = builder
            .select(vec![self.expression()?])
            .from_object(self.object.as_str());
        if let Some(clause) = self.filter.as_deref().filter(|w| !w.trim().is_empty()) {
            builder = builder.filter_raw(clause.trim());
        }
        if let Some(group_by) = group_by {
            builder = builder.group_by(group_by);
        }
        Ok(builder)
    }
}

/// Rows of an aggregate query
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub soql: String,
    pub rows: Vec<FlatRecord>,
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

impl Report for AggregateReport {
    fn table(&self) -> Table {
        Table::from_records(&self.rows)
    }
}

/// Schema of one object
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct DescribeReport(pub ObjectDescription);

impl fmt::Display for DescribeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = &self.0;
        writeln!(f, "=== {} ({}) ===", desc.label, desc.name)?;
        writeln!(f, "  Key Prefix: {}", desc.key_prefix.as_deref().unwrap_or("N/A"))?;
        writeln!(f, "  Custom: {}", desc.custom)?;
        writeln!(f, "  Createable: {}", desc.createable)?;
        writeln!(f, "  Updateable: {}", desc.updateable)?;
        writeln!(f, "\n--- Fields ---")?;
        write!(f, "{}", self.table())?;

        let named: Vec<_> = desc
            .child_relationships
            .iter()
            .filter_map(|rel| rel.relationship_name.as_deref().map(|name| (name, rel)))
            .collect();
        if !named.is_empty() {
            write!(f, "\n\n--- Child Relationships ---")?;
            for (name, rel) in named {
                write!(f, "\n  {} -> {}.{}", name, rel.child_object, rel.field)?;
            }
        }
        Ok(())
    }
}

impl Report for DescribeReport {
    /// Fields sorted by API name; picklist values follow their field
    fn table(&self) -> Table {
        let mut fields: Vec<_> = self.0.fields.iter().collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));

        let mut table = Table::new(["API Name", "Label", "Type", "Req", "Update"]);
        let yes = |flag: bool| if flag { "Yes" } else { "" };
        for field in fields {
            table.push_row([
                field.name.as_str(),
                field.label.as_str(),
                field.field_type.as_str(),
                yes(field.is_required()),
                yes(field.updateable),
            ]);
            if field.field_type != "picklist" {
                continue;
            }
            for value in &field.picklist_values {
                let mut entry = format!("  -> {}", value.value);
                if !value.active {
                    entry.push_str(" (inactive)");
                }
                if value.default_value {
                    entry.push_str(" (default)");
                }
                table.push_row([String::new(), entry]);
            }
        }
        table
    }
}

impl<S: RecordSource> Reporter<S> {
    /// Run arbitrary SOQL, keeping at most `max_display_rows` rows
    pub async fn query(&self, soql: &str) -> ReportResult<QueryReport> {
        let soql = soql.trim();
        if soql.is_empty() {
            return Err(ReportError::Invalid {
                field: "soql",
                message: "query text is empty".to_string(),
            });
        }

        let mut rows = self.source.query_flat(soql).await?;
        let total = rows.len();
        rows.truncate(self.config.max_display_rows);
        tracing::debug!(total, shown = rows.len(), "Ad hoc query");

        Ok(QueryReport { total, rows })
    }

    /// Run a COUNT/SUM/AVG/MIN/MAX query
    pub async fn aggregate(&self, request: &AggregateRequest) -> ReportResult<AggregateReport> {
        let builder = request.to_builder()?;
        let soql = builder.build()?;
        let rows = self.source.query_flat(&soql).await?;
        Ok(AggregateReport { soql, rows })
    }

    /// Describe an object's fields and relationships
    pub async fn describe(&self, object: &str) -> ReportResult<DescribeReport> {
        Ok(DescribeReport(self.source.describe(object).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportingConfig;
    use crate::salesforce::memory::MemorySource;
    use serde_json::json;

    fn reporter(source: MemorySource, max_rows: usize) -> Reporter<MemorySource> {
        let config = ReportingConfig {
            max_display_rows: max_rows,
            ..ReportingConfig::default()
        };
        Reporter::new(source, config)
    }

    #[tokio::test]
    async fn test_query_truncates_but_reports_total() {
        let records: Vec<_> = (1..=5)
            .map(|i| json!({"attributes": {"type": "Work_Item__c"}, "Name": format!("WI-{:04}", i)}))
            .collect();
        let source = MemorySource::new().on("FROM Work_Item__c", json!(records));
        let report = reporter(source, 3)
            .query("SELECT Name FROM Work_Item__c")
            .await
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.rows.len(), 3);
        assert!(report.to_string().ends_with("(Showing first 3 of 5 records)"));
    }

    #[tokio::test]
    async fn test_query_rejects_blank_text() {
        let reporter = reporter(MemorySource::new(), 200);
        assert!(reporter.query("   ").await.is_err());
        assert!(reporter.source().queries().is_empty());
    }

    #[test]
    fn test_aggregate_function_parsing() {
        assert_eq!(" avg ".parse::<AggregateFunction>().unwrap(), AggregateFunction::Avg);
        let err = "MEDIAN".parse::<AggregateFunction>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid aggregate function: 'MEDIAN'. Valid options: AVG, COUNT, MAX, MIN, SUM"
        );
    }

    #[tokio::test]
    async fn test_aggregate_sum_grouped() {
        let source = MemorySource::new().on(
            "GROUP BY Type__c",
            json!([
                {"attributes": {"type": "AggregateResult"}, "Type__c": "Bug", "result": 12.5},
                {"attributes": {"type": "AggregateResult"}, "Type__c": "Feature", "result": 30}
            ]),
        );
        let request = AggregateRequest::new("Work_Item__c", AggregateFunction::Sum)
            .field("Actual_Hours__c")
            .group_by("Type__c")
            .filter("Status__c = 'Done'");
        let report = reporter(source, 200).aggregate(&request).await.unwrap();

        assert_eq!(
            report.soql,
            "SELECT Type__c, SUM(Actual_Hours__c) result FROM Work_Item__c \
             WHERE Status__c = 'Done' GROUP BY Type__c"
        );
        let table = report.table();
        assert_eq!(table.headers, vec!["Type__c", "result"]);
        assert_eq!(table.rows[1], vec!["Feature", "30"]);
    }

    #[tokio::test]
    async fn test_aggregate_count_variants() {
        let reporter = reporter(MemorySource::new(), 200);
        let plain = AggregateRequest::new("Project__c", AggregateFunction::Count);
        let report = reporter.aggregate(&plain).await.unwrap();
        assert_eq!(report.soql, "SELECT COUNT(Id) record_count FROM Project__c");

        let by_field = plain.clone().field("Status__c");
        let report = reporter.aggregate(&by_field).await.unwrap();
        assert_eq!(report.soql, "SELECT COUNT(Status__c) field_count FROM Project__c");
    }

    #[tokio::test]
    async fn test_aggregate_requires_field() {
        let reporter = reporter(MemorySource::new(), 200);
        let request = AggregateRequest::new("Work_Item__c", AggregateFunction::Max);
        let err = reporter.aggregate(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid field: required for MAX");
        assert!(reporter.source().queries().is_empty());
    }

    fn description() -> ObjectDescription {
        serde_json::from_value(json!({
            "name": "Work_Item__c",
            "label": "Work Item",
            "keyPrefix": "a01",
            "custom": true,
            "createable": true,
            "updateable": true,
            "fields": [
                {"name": "Status__c", "label": "Status", "type": "picklist",
                 "nillable": false, "createable": true, "updateable": true,
                 "picklistValues": [
                     {"value": "To Do", "active": true, "defaultValue": true},
                     {"value": "Legacy", "active": false, "defaultValue": false}
                 ]},
                {"name": "Id", "label": "Record ID", "type": "id",
                 "nillable": false, "createable": false, "updateable": false}
            ],
            "childRelationships": [
                {"relationshipName": "Time_Entries__r", "childSObject": "Time_Entry__c",
                 "field": "Work_Item__c"},
                {"relationshipName": null, "childSObject": "FeedItem", "field": "ParentId"}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_describe() {
        let source = MemorySource::new().with_description(description());
        let report = reporter(source, 200).describe("Work_Item__c").await.unwrap();

        let table = report.table();
        assert_eq!(table.rows[0], vec!["Id", "Record ID", "id", "", ""]);
        assert_eq!(table.rows[1], vec!["Status__c", "Status", "picklist", "Yes", "Yes"]);
        assert_eq!(table.rows[2], vec!["", "  -> To Do (default)", "-", "-", "-"]);
        assert_eq!(table.rows[3][1], "  -> Legacy (inactive)");

        let text = report.to_string();
        assert!(text.starts_with("=== Work Item (Work_Item__c) ===\n  Key Prefix: a01"));
        assert!(text.ends_with("--- Child Relationships ---\n  Time_Entries__r -> Time_Entry__c.Work_Item__c"));
        assert!(!text.contains("FeedItem"));
    }

    #[tokio::test]
    async fn test_describe_unknown_object() {
        let reporter = reporter(MemorySource::new(), 200);
        assert!(reporter.describe("Nope__c").await.is_err());
    }
}
