//! Work item listing, time logging and status updates

use super::table::{cell, Table};
use super::{
    record_id, Report, ReportError, ReportResult, Reporter, TIME_ENTRY_OBJECT, WORK_ITEM_OBJECT,
};
use crate::query::{Direction, QueryBuilder};
use crate::records::{FlatRecord, Record};
use crate::salesforce::RecordSource;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Fields shown for work items
pub const WORK_ITEM_FIELDS: [&str; 11] = [
    "Id",
    "Name",
    "Subject__c",
    "Status__c",
    "Priority__c",
    "Type__c",
    "Due_Date__c",
    "Estimated_Hours__c",
    "Actual_Hours__c",
    "Project__r.Name",
    "Assigned_To__r.Name",
];

/// Rows returned by a work item listing
pub const WORK_ITEM_LIMIT: i64 = 200;

/// Maximum hours in a single time entry
pub const MAX_ENTRY_HOURS: f64 = 24.0;

/// Work item lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkItemStatus {
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
    Blocked,
}

impl WorkItemStatus {
    pub const ALL: [WorkItemStatus; 4] = [Self::ToDo, Self::InProgress, Self::Done, Self::Blocked];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
            Self::Blocked => "Blocked",
        }
    }
}

impl FromStr for WorkItemStatus {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let mut valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                valid.sort_unstable();
                ReportError::Invalid {
                    field: "status",
                    message: format!("'{}'. Valid statuses: {}", s, valid.join(", ")),
                }
            })
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for a work item listing
#[derive(Debug, Clone, Default)]
pub struct WorkItemFilter {
    pub status: Option<String>,
    pub project: Option<String>,
    pub due_today: bool,
}

/// Work item listing
#[derive(Debug, Clone, Serialize)]
pub struct WorkItemList {
    pub items: Vec<FlatRecord>,
}

impl fmt::Display for WorkItemList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

impl Report for WorkItemList {
    fn table(&self) -> Table {
        Table::from_records(&self.items)
    }
}

/// A time entry to log
#[derive(Debug, Clone)]
pub struct TimeEntryRequest {
    /// Auto-number name of the work item, e.g. `WI-0005`
    pub work_item: String,
    pub hours: f64,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// Confirmation of a created time entry
#[derive(Debug, Clone, Serialize)]
pub struct TimeEntryReceipt {
    pub id: String,
    pub work_item: String,
    pub subject: String,
    pub hours: f64,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl fmt::Display for TimeEntryReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time entry created successfully.")?;
        writeln!(f, "  ID: {}", self.id)?;
        writeln!(f, "  Work Item: {} - {}", self.work_item, self.subject)?;
        writeln!(f, "  Hours: {}", self.hours)?;
        writeln!(f, "  Date: {}", self.date)?;
        write!(f, "  Notes: {}", self.notes.as_deref().unwrap_or("(none)"))
    }
}

impl Report for TimeEntryReceipt {
    fn table(&self) -> Table {
        let mut table = Table::new(["id", "work_item", "subject", "hours", "date", "notes"]);
        table.push_row([
            self.id.clone(),
            self.work_item.clone(),
            self.subject.clone(),
            self.hours.to_string(),
            self.date.to_string(),
            self.notes.clone().unwrap_or_default(),
        ]);
        table
    }
}

/// Confirmation of a status change
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub work_item: String,
    pub subject: String,
    pub old_status: String,
    pub new_status: WorkItemStatus,
}

impl fmt::Display for StatusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status updated successfully.")?;
        writeln!(f, "  Work Item: {} - {}", self.work_item, self.subject)?;
        writeln!(f, "  Old Status: {}", self.old_status)?;
        write!(f, "  New Status: {}", self.new_status)
    }
}

impl Report for StatusChange {
    fn table(&self) -> Table {
        let mut table = Table::new(["work_item", "subject", "old_status", "new_status"]);
        table.push_row([
            self.work_item.clone(),
            self.subject.clone(),
            self.old_status.clone(),
            self.new_status.to_string(),
        ]);
        table
    }
}

impl<S: RecordSource> Reporter<S> {
    /// List work items, soonest due first
    pub async fn work_items(&self, filter: &WorkItemFilter) -> ReportResult<WorkItemList> {
        let mut builder = QueryBuilder::new()
            .select(WORK_ITEM_FIELDS)
            .from_object(WORK_ITEM_OBJECT);

        if let Some(status) = &filter.status {
            builder = builder.filter("Status__c", "=", status)?;
        }
        if let Some(project) = &filter.project {
            builder = builder.filter("Project__r.Name", "=", project)?;
        }
        if filter.due_today {
            builder = builder.filter("Due_Date__c", "=", "TODAY")?;
        }

        let builder = builder
            .order_by_dir("Due_Date__c", Direction::Asc)
            .limit(WORK_ITEM_LIMIT)?;

        Ok(WorkItemList {
            items: self.fetch(builder).await?,
        })
    }

    /// Look up a work item by its auto-number name
    async fn find_work_item(&self, name: &str, fields: &[&str]) -> ReportResult<FlatRecord> {
        let builder = QueryBuilder::new()
            .select(fields)
            .from_object(WORK_ITEM_OBJECT)
            .filter("Name", "=", name)?;

        self.fetch_one(builder)
            .await?
            .ok_or_else(|| ReportError::NotFound {
                object: "Work item",
                name: name.to_string(),
            })
    }

    /// Log hours against a work item
    pub async fn log_time(&self, request: &TimeEntryRequest) -> ReportResult<TimeEntryReceipt> {
        if request.hours.is_nan() || request.hours <= 0.0 {
            return Err(ReportError::Invalid {
                field: "hours",
                message: "must be greater than 0".to_string(),
            });
        }
        if request.hours > MAX_ENTRY_HOURS {
            return Err(ReportError::Invalid {
                field: "hours",
                message: "cannot exceed 24 for a single entry".to_string(),
            });
        }

        let item = self
            .find_work_item(&request.work_item, &["Id", "Name", "Subject__c"])
            .await?;
        let item_id = record_id(&item)?.to_string();

        let notes = request.notes.as_deref().filter(|n| !n.trim().is_empty());
        let mut fields = Record::new();
        fields.insert("Work_Item__c".into(), Value::from(item_id.clone()));
        fields.insert("Hours__c".into(), Value::from(request.hours));
        fields.insert("Date__c".into(), Value::from(request.date.to_string()));
        if let Some(notes) = notes {
            fields.insert("Notes__c".into(), Value::from(notes));
        }

        let id = self.source.create(TIME_ENTRY_OBJECT, fields).await?;
        tracing::info!(work_item = %request.work_item, hours = request.hours, %id, "Logged time");

        Ok(TimeEntryReceipt {
            id,
            work_item: request.work_item.clone(),
            subject: item.get_str("Subject__c").unwrap_or_default().to_string(),
            hours: request.hours,
            date: request.date,
            notes: notes.map(String::from),
        })
    }

    /// Move a work item to a new status
    pub async fn update_status(
        &self,
        work_item: &str,
        status: WorkItemStatus,
    ) -> ReportResult<StatusChange> {
        let item = self
            .find_work_item(work_item, &["Id", "Name", "Status__c", "Subject__c"])
            .await?;
        let item_id = record_id(&item)?;

        let mut fields = Record::new();
        fields.insert("Status__c".into(), Value::from(status.as_str()));
        self.source.update(WORK_ITEM_OBJECT, item_id, fields).await?;

        let old_status = match item.get("Status__c") {
            Some(Value::Null) | None => "unknown".to_string(),
            other => cell(other),
        };
        tracing::info!(work_item, %old_status, new_status = %status, "Updated status");

        Ok(StatusChange {
            work_item: work_item.to_string(),
            subject: item.get_str("Subject__c").unwrap_or_default().to_string(),
            old_status,
            new_status: status,
        })
    }
}
