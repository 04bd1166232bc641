//! Project summary

use super::table::{hours, Table};
use super::{
    or_na, record_id, Report, ReportError, ReportResult, Reporter, PROJECT_OBJECT,
    WORK_ITEM_OBJECT,
};
use crate::analytics::burn_rate_pct;
use crate::query::{Direction, QueryBuilder};
use crate::records::FlatRecord;
use crate::salesforce::RecordSource;
use serde::Serialize;
use std::fmt;

/// Rows fetched for overdue and blocked lists
pub const ATTENTION_LIMIT: i64 = 50;

/// Work items per status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

/// Status, schedule and burn for one project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    /// Share of the estimate consumed, in percent
    pub burn_rate_pct: f64,
    pub status_breakdown: Vec<StatusCount>,
    pub overdue: Vec<FlatRecord>,
    pub blocked: Vec<FlatRecord>,
}

impl fmt::Display for ProjectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Project Summary: {} ===", self.name)?;
        writeln!(f, "  Status: {}", or_na(self.status.as_deref()))?;
        writeln!(f, "  Start Date: {}", or_na(self.start_date.as_deref()))?;
        writeln!(f, "  End Date: {}", or_na(self.end_date.as_deref()))?;
        writeln!(f, "  Estimated Hours: {}", hours(self.estimated_hours))?;
        writeln!(f, "  Actual Hours: {}", hours(self.actual_hours))?;
        writeln!(f, "  Burn Rate: {:.1}% of estimate consumed", self.burn_rate_pct)?;

        writeln!(f, "\n--- Status Breakdown ---")?;
        if self.status_breakdown.is_empty() {
            writeln!(f, "  No work items found.")?;
        } else {
            writeln!(f, "{}", self.table())?;
        }

        writeln!(f, "\n--- Overdue Items ({}) ---", self.overdue.len())?;
        if self.overdue.is_empty() {
            writeln!(f, "  None - all items are on track!")?;
        } else {
            writeln!(f, "{}", Table::from_records(&self.overdue))?;
        }

        write!(f, "\n--- Blocked Items ({}) ---\n", self.blocked.len())?;
        if self.blocked.is_empty() {
            write!(f, "  None - no blockers!")
        } else {
            write!(f, "{}", Table::from_records(&self.blocked))
        }
    }
}

impl Report for ProjectSummary {
    fn table(&self) -> Table {
        let mut table = Table::new(["Status__c", "item_count"]);
        for entry in &self.status_breakdown {
            table.push_row([entry.status.clone(), entry.count.to_string()]);
        }
        table
    }
}

impl<S: RecordSource> Reporter<S> {
    /// Summarize a project by name
    pub async fn project_summary(&self, name: &str) -> ReportResult<ProjectSummary> {
        let project = self
            .fetch_one(
                QueryBuilder::new()
                    .select([
                        "Id",
                        "Name",
                        "Status__c",
                        "Start_Date__c",
                        "End_Date__c",
                        "Total_Estimated_Hours__c",
                        "Total_Actual_Hours__c",
                    ])
                    .from_object(PROJECT_OBJECT)
                    .filter("Name", "=", name)?,
            )
            .await?
            .ok_or_else(|| ReportError::NotFound {
                object: "Project",
                name: name.to_string(),
            })?;
        let project_id = record_id(&project)?;

        let by_status = QueryBuilder::new()
            .select("Status__c, COUNT(Id) item_count")
            .from_object(WORK_ITEM_OBJECT)
            .filter("Project__c", "=", project_id)?
            .group_by("Status__c");

        let overdue = QueryBuilder::new()
            .select([
                "Name",
                "Subject__c",
                "Due_Date__c",
                "Status__c",
                "Assigned_To__r.Name",
            ])
            .from_object(WORK_ITEM_OBJECT)
            .filter("Project__c", "=", project_id)?
            .filter("Due_Date__c", "<", "TODAY")?
            .filter_not_in("Status__c", ["Done"])?
            .order_by_dir("Due_Date__c", Direction::Asc)
            .limit(ATTENTION_LIMIT)?;

        let blocked = QueryBuilder::new()
            .select(["Name", "Subject__c", "Assigned_To__r.Name"])
            .from_object(WORK_ITEM_OBJECT)
            .filter("Project__c", "=", project_id)?
            .filter("Status__c", "=", "Blocked")?
            .limit(ATTENTION_LIMIT)?;

        let (by_status, overdue, blocked) = tokio::try_join!(
            self.fetch(by_status),
            self.fetch(overdue),
            self.fetch(blocked)
        )?;

        let estimated_hours = project.get_f64("Total_Estimated_Hours__c").unwrap_or(0.0);
        let actual_hours = project.get_f64("Total_Actual_Hours__c").unwrap_or(0.0);
        let text = |column: &str| project.get_str(column).map(String::from);

        Ok(ProjectSummary {
            name: name.to_string(),
            status: text("Status__c"),
            start_date: text("Start_Date__c"),
            end_date: text("End_Date__c"),
            estimated_hours,
            actual_hours,
            burn_rate_pct: burn_rate_pct(actual_hours, estimated_hours),
            status_breakdown: by_status
                .iter()
                .map(|row| StatusCount {
                    status: row.label("Status__c").unwrap_or_else(|| "(none)".to_string()),
                    count: row.get_f64("item_count").unwrap_or(0.0) as u64,
                })
                .collect(),
            overdue,
            blocked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportingConfig;
    use crate::salesforce::memory::MemorySource;
    use serde_json::json;

    fn source() -> MemorySource {
        MemorySource::new()
            .on(
                "FROM Project__c",
                json!([{
                    "attributes": {"type": "Project__c"},
                    "Id": "a00000000000001",
                    "Name": "Alpha",
                    "Status__c": "Active",
                    "Start_Date__c": "2024-01-01",
                    "End_Date__c": null,
                    "Total_Estimated_Hours__c": 40.0,
                    "Total_Actual_Hours__c": 30.0
                }]),
            )
            .on(
                "GROUP BY Status__c",
                json!([
                    {"attributes": {"type": "AggregateResult"}, "Status__c": "Done", "item_count": 3},
                    {"attributes": {"type": "AggregateResult"}, "Status__c": "Blocked", "item_count": 1}
                ]),
            )
            .on(
                "Due_Date__c < TODAY",
                json!([{
                    "attributes": {"type": "Work_Item__c"},
                    "Name": "WI-0002",
                    "Subject__c": "Write docs",
                    "Due_Date__c": "2024-01-05",
                    "Status__c": "To Do",
                    "Assigned_To__r": null
                }]),
            )
    }

    #[tokio::test]
    async fn test_project_summary() {
        let reporter = Reporter::new(source(), ReportingConfig::default());
        let summary = reporter.project_summary("Alpha").await.unwrap();

        assert_eq!(summary.burn_rate_pct, 75.0);
        assert_eq!(summary.end_date, None);
        assert_eq!(
            summary.status_breakdown,
            vec![
                StatusCount { status: "Done".into(), count: 3 },
                StatusCount { status: "Blocked".into(), count: 1 },
            ]
        );
        assert_eq!(summary.overdue.len(), 1);
        assert!(summary.blocked.is_empty());

        let text = summary.to_string();
        assert!(text.contains("Burn Rate: 75.0% of estimate consumed"));
        assert!(text.contains("End Date: N/A"));
        assert!(text.contains("--- Overdue Items (1) ---"));
        assert!(text.contains("None - no blockers!"));

        let queries = reporter.source().queries();
        assert_eq!(queries.len(), 4);
        assert!(queries.iter().any(|q| q.contains(
            "WHERE Project__c = 'a00000000000001' AND Due_Date__c < TODAY \
             AND Status__c NOT IN ('Done') ORDER BY Due_Date__c ASC LIMIT 50"
        )));
        assert!(queries.iter().any(|q| q
            == "SELECT Status__c, COUNT(Id) item_count FROM Work_Item__c \
                WHERE Project__c = 'a00000000000001' GROUP BY Status__c"));
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let reporter = Reporter::new(MemorySource::new(), ReportingConfig::default());
        let err = reporter.project_summary("Nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Project 'Nope' not found");
    }

    #[tokio::test]
    async fn test_project_without_id_is_decode_error() {
        let source = MemorySource::new().on(
            "FROM Project__c",
            json!([{"Name": "Alpha", "Status__c": "Active"}]),
        );
        let reporter = Reporter::new(source, ReportingConfig::default());
        let err = reporter.project_summary("Alpha").await.unwrap_err();
        assert!(matches!(
            err,
            ReportError::Salesforce(crate::salesforce::SalesforceError::Decode(_))
        ));
        assert_eq!(reporter.source().queries().len(), 1);
    }
}
