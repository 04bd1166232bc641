//! Analytics reports: estimate accuracy, utilization, velocity, scope and
//! daily budget

use super::table::{cell, hours, Table};
use super::{last_n_weeks, Report, ReportError, ReportResult, Reporter, TIME_ENTRY_OBJECT, WORK_ITEM_OBJECT};
use crate::analytics::{
    percent_of, Analysis, AggregateTable, BudgetStatus, ColumnKey, DailyBudget, EstimateBias,
    GroupedAggregation, Pivot, PivotTable, RatioStatistics, RollingTrend, ScopeProjection,
    Utilization, WeeklyTrend, TOTAL_LABEL,
};
use crate::query::{Direction, QueryBuilder};
use crate::records::FlatRecord;
use crate::salesforce::RecordSource;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

const ESTIMATE: &str = "Estimated_Hours__c";
const ACTUAL: &str = "Actual_Hours__c";
const PROJECT_NAME: &str = "Work_Item__r.Project__r.Name";

/// Completed items scanned for estimate accuracy
pub const ACCURACY_LIMIT: i64 = 2_000;

/// Rows scanned by history-based reports
pub const HISTORY_LIMIT: i64 = 5_000;

/// Items considered for the daily budget
pub const BUDGET_LIMIT: i64 = 100;

/// Dimension for grouping estimate accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupDimension {
    Type,
    Project,
    Priority,
}

impl GroupDimension {
    /// Column holding the dimension
    pub fn field(&self) -> &'static str {
        match self {
            Self::Type => "Type__c",
            Self::Project => "Project__r.Name",
            Self::Priority => "Priority__c",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Type => "Type",
            Self::Project => "Project",
            Self::Priority => "Priority",
        }
    }
}

impl FromStr for GroupDimension {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "type" => Ok(Self::Type),
            "project" => Ok(Self::Project),
            "priority" => Ok(Self::Priority),
            _ => Err(ReportError::Invalid {
                field: "group_by",
                message: format!("'{}'. Options: type, project, priority", s),
            }),
        }
    }
}

/// Grouped accuracy plus overall totals
#[derive(Debug, Clone, Serialize)]
pub struct AccuracyBreakdown {
    pub groups: AggregateTable,
    pub overall_actual: f64,
    pub overall_estimated: f64,
    pub overall_pct: f64,
}

/// Estimate accuracy of completed work
#[derive(Debug, Clone, Serialize)]
pub struct EstimateAccuracyReport {
    pub group_by: GroupDimension,
    pub accuracy: Analysis<AccuracyBreakdown>,
}

impl fmt::Display for EstimateAccuracyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Analysis::Ready(accuracy) = &self.accuracy else {
            return write!(
                f,
                "No completed work items with both estimated and actual hours found."
            );
        };
        writeln!(f, "=== Estimation Accuracy by {} ===\n", self.group_by.title())?;
        writeln!(f, "{}\n", self.table())?;
        write!(
            f,
            "Overall: {:.1}h actual / {:.1}h estimated = {:.1}%",
            accuracy.overall_actual, accuracy.overall_estimated, accuracy.overall_pct
        )
    }
}

impl Report for EstimateAccuracyReport {
    fn table(&self) -> Table {
        let Analysis::Ready(accuracy) = &self.accuracy else {
            return Table::default();
        };
        let groups = &accuracy.groups;
        let mut table = Table::new(
            std::iter::once(groups.key_column.clone()).chain(groups.columns.iter().cloned()),
        );
        for row in &groups.rows {
            let values = groups.columns.iter().map(|c| match row.get(c) {
                Some(v) if c == "items" => format!("{}", v),
                Some(v) => format!("{:.1}", v),
                None => cell(None),
            });
            table.push_row(std::iter::once(row.key.clone()).chain(values));
        }
        table
    }
}

/// Pivot of hours plus per-day utilization
#[derive(Debug, Clone, Serialize)]
pub struct UtilizationBreakdown {
    pub pivot: PivotTable,
    pub days: Vec<Utilization>,
}

/// Hours logged per project per day
#[derive(Debug, Clone, Serialize)]
pub struct UtilizationReport {
    pub weeks: u32,
    pub capacity_hours: f64,
    pub utilization: Analysis<UtilizationBreakdown>,
}

impl fmt::Display for UtilizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Analysis::Ready(breakdown) = &self.utilization else {
            return write!(f, "No time entries found in the last {} week(s).", self.weeks);
        };
        writeln!(f, "=== Weekly Utilization (last {} weeks) ===\n", self.weeks)?;
        writeln!(f, "{}\n", self.table())?;
        write!(f, "--- Daily Utilization ({}hr day) ---", self.capacity_hours)?;
        for day in &breakdown.days {
            write!(
                f,
                "\n  {}: {:.1}h / {}h ({:.0}%) {}",
                day.label, day.hours, day.capacity, day.percent, day.bar
            )?;
        }
        Ok(())
    }
}

impl Report for UtilizationReport {
    fn table(&self) -> Table {
        let Analysis::Ready(breakdown) = &self.utilization else {
            return Table::default();
        };
        let pivot = &breakdown.pivot;
        let mut table = Table::new(
            std::iter::once(pivot.row_dimension.clone())
                .chain(pivot.column_keys.iter().cloned())
                .chain(std::iter::once(TOTAL_LABEL.to_string())),
        );
        for (i, key) in pivot.row_keys.iter().enumerate() {
            table.push_row(
                std::iter::once(key.clone())
                    .chain(pivot.cells[i].iter().map(|v| hours(*v)))
                    .chain(std::iter::once(hours(pivot.row_totals[i]))),
            );
        }
        table.push_row(
            std::iter::once(TOTAL_LABEL.to_string())
                .chain(pivot.column_totals.iter().map(|v| hours(*v)))
                .chain(std::iter::once(hours(pivot.grand_total))),
        );
        table
    }
}

/// Completed items per ISO week
#[derive(Debug, Clone, Serialize)]
pub struct VelocityReport {
    pub weeks: u32,
    pub trend: Analysis<WeeklyTrend>,
}

impl fmt::Display for VelocityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Analysis::Ready(trend) = &self.trend else {
            return write!(f, "No completed items found in the last {} weeks.", self.weeks);
        };
        writeln!(f, "=== Velocity Trend (last {} weeks) ===\n", self.weeks)?;
        writeln!(f, "{}\n", self.table())?;
        write!(f, "Average velocity: {:.1} items/week", trend.average_count)
    }
}

impl Report for VelocityReport {
    fn table(&self) -> Table {
        let Analysis::Ready(trend) = &self.trend else {
            return Table::default();
        };
        let mut table = Table::new([
            "week_label",
            "items_completed",
            "total_hours",
            "rolling_avg",
            "trend",
        ]);
        for bucket in &trend.buckets {
            table.push_row([
                bucket.label.clone(),
                bucket.count.to_string(),
                hours(bucket.total),
                format!("{:.1}", bucket.rolling_avg),
                bucket
                    .trend
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "--".to_string()),
            ]);
        }
        table
    }
}

/// Historical statistics applied to a gut estimate
#[derive(Debug, Clone, Serialize)]
pub struct ScopeEstimate {
    pub statistics: RatioStatistics,
    pub projection: ScopeProjection,
    pub bias: EstimateBias,
}

/// Data-driven scope estimate for a work type
#[derive(Debug, Clone, Serialize)]
pub struct ScopeEstimateReport {
    pub work_type: String,
    pub gut_estimate: f64,
    pub estimate: Analysis<ScopeEstimate>,
}

impl fmt::Display for ScopeEstimateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Analysis::Ready(estimate) = &self.estimate else {
            return write!(
                f,
                "No completed '{}' items with estimate data found. Cannot produce adjusted estimate.",
                self.work_type
            );
        };
        let stats = &estimate.statistics;
        let projection = &estimate.projection;

        writeln!(f, "=== Scope Estimate for '{}' ===\n", self.work_type)?;
        writeln!(f, "Historical data ({} completed items):", stats.sample_size)?;
        writeln!(f, "  Mean actual hours:    {:.1}h", stats.mean_actual)?;
        writeln!(f, "  Median actual hours:  {:.1}h", stats.median_actual)?;
        writeln!(f, "  Std deviation:        {:.1}h", stats.stdev_actual)?;
        writeln!(f, "  Avg overrun ratio:    {:.2}x\n", stats.mean_ratio)?;
        writeln!(f, "Your gut estimate:      {:.1}h", projection.input)?;
        writeln!(
            f,
            "Adjusted estimate:      {:.1}h (gut x {:.2})",
            projection.adjusted, stats.mean_ratio
        )?;
        writeln!(f, "Conservative (P80):     {:.1}h\n", projection.conservative)?;

        match estimate.bias {
            EstimateBias::Overrun => write!(
                f,
                "Warning: Historical items of type '{}' tend to overrun by {:.0}% on average. Plan accordingly.",
                self.work_type,
                (stats.mean_ratio - 1.0) * 100.0
            ),
            EstimateBias::Underrun => write!(
                f,
                "Note: Historical items of type '{}' tend to come in under estimate by {:.0}%.",
                self.work_type,
                (1.0 - stats.mean_ratio) * 100.0
            ),
            EstimateBias::Accurate => {
                write!(f, "Estimates for this type are historically fairly accurate.")
            }
        }
    }
}

impl Report for ScopeEstimateReport {
    fn table(&self) -> Table {
        let Analysis::Ready(estimate) = &self.estimate else {
            return Table::default();
        };
        let stats = &estimate.statistics;
        let mut table = Table::new(["metric", "value"]);
        for (metric, value) in [
            ("sample_size", stats.sample_size.to_string()),
            ("mean_actual", format!("{:.2}", stats.mean_actual)),
            ("median_actual", format!("{:.2}", stats.median_actual)),
            ("stdev_actual", format!("{:.2}", stats.stdev_actual)),
            ("mean_ratio", format!("{:.3}", stats.mean_ratio)),
            ("gut_estimate", format!("{:.2}", estimate.projection.input)),
            ("adjusted", format!("{:.2}", estimate.projection.adjusted)),
            ("conservative", format!("{:.2}", estimate.projection.conservative)),
        ] {
            table.push_row([metric.to_string(), value]);
        }
        table
    }
}

/// Today's workload against a target
#[derive(Debug, Clone, Serialize)]
pub struct DailyBudgetReport {
    pub date: NaiveDate,
    pub target_hours: f64,
    pub budget: Analysis<DailyBudget>,
    pub items: Vec<FlatRecord>,
}

impl fmt::Display for DailyBudgetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Daily Budget - {} ===", self.date.format("%A, %B %d, %Y"))?;
        writeln!(f, "Target: {:.1} hours\n", self.target_hours)?;

        let Analysis::Ready(budget) = &self.budget else {
            return write!(f, "No items due today or in progress. Your day is open!");
        };

        writeln!(f, "Items on plate: {}", budget.items)?;
        writeln!(f, "Estimated remaining work: {:.1}h", budget.remaining_work)?;
        writeln!(f, "Budget remaining: {:.1}h\n", budget.remaining_budget)?;

        match budget.status {
            BudgetStatus::OverCommitted => writeln!(
                f,
                "WARNING: Over-committed by {:.1}h! Consider deferring or reassigning items.",
                budget.remaining_budget.abs()
            )?,
            BudgetStatus::Tight => {
                writeln!(f, "Tight day -- little room for unplanned work.")?
            }
            BudgetStatus::Slack => writeln!(
                f,
                "You have ~{:.1}h of slack for meetings or unplanned work.",
                budget.remaining_budget
            )?,
        }

        write!(f, "\n--- Today's Items ---\n{}", self.table())
    }
}

impl Report for DailyBudgetReport {
    fn table(&self) -> Table {
        Table::from_records(&self.items)
    }
}

impl<S: RecordSource> Reporter<S> {
    /// Actual vs estimated hours of completed work, by dimension
    pub async fn estimate_accuracy(
        &self,
        group_by: GroupDimension,
    ) -> ReportResult<EstimateAccuracyReport> {
        let builder = QueryBuilder::new()
            .select(["Id", "Name", group_by.field(), ESTIMATE, ACTUAL])
            .from_object(WORK_ITEM_OBJECT)
            .filter("Status__c", "=", "Done")?
            .filter_not_null(ESTIMATE)
            .filter_not_null(ACTUAL)
            .limit(ACCURACY_LIMIT)?;
        let rows = self.fetch(builder).await?;

        let groups = GroupedAggregation::by(group_by.field())
            .count("Id", "items")
            .sum(ESTIMATE, "total_estimated")
            .sum(ACTUAL, "total_actual")
            .ratio("total_actual", "total_estimated")
            .apply(&rows);

        let overall_estimated: f64 = rows.iter().filter_map(|r| r.get_f64(ESTIMATE)).sum();
        let overall_actual: f64 = rows.iter().filter_map(|r| r.get_f64(ACTUAL)).sum();

        Ok(EstimateAccuracyReport {
            group_by,
            accuracy: groups.map(|groups| AccuracyBreakdown {
                groups,
                overall_actual,
                overall_estimated,
                overall_pct: percent_of(overall_actual, overall_estimated),
            }),
        })
    }

    /// Hours per project per day over recent weeks
    pub async fn weekly_utilization(&self, weeks: u32) -> ReportResult<UtilizationReport> {
        let builder = QueryBuilder::new()
            .select(["Id", "Date__c", "Hours__c", PROJECT_NAME])
            .from_object(TIME_ENTRY_OBJECT)
            .filter("Date__c", ">=", last_n_weeks(weeks)?)?
            .order_by_dir("Date__c", Direction::Asc)
            .limit(HISTORY_LIMIT)?;
        let rows = self.fetch(builder).await?;

        let capacity = self.config.daily_capacity_hours;
        let utilization = Pivot::new(PROJECT_NAME, ColumnKey::Day("Date__c".into()), "Hours__c")
            .apply(&rows)
            .map(|pivot| UtilizationBreakdown {
                days: pivot.utilization(capacity),
                pivot,
            });

        Ok(UtilizationReport {
            weeks,
            capacity_hours: capacity,
            utilization,
        })
    }

    /// Completed items per week with a rolling average
    pub async fn velocity_trend(&self, weeks: u32) -> ReportResult<VelocityReport> {
        let builder = QueryBuilder::new()
            .select(["Id", "Completed_Date__c", ESTIMATE, ACTUAL])
            .from_object(WORK_ITEM_OBJECT)
            .filter("Status__c", "=", "Done")?
            .filter("Completed_Date__c", ">=", last_n_weeks(weeks)?)?
            .filter_not_null("Completed_Date__c")
            .order_by_dir("Completed_Date__c", Direction::Asc)
            .limit(HISTORY_LIMIT)?;
        let rows = self.fetch(builder).await?;

        Ok(VelocityReport {
            weeks,
            trend: RollingTrend::new("Completed_Date__c", ACTUAL).apply(&rows),
        })
    }

    /// Adjust a gut estimate by the history of a work type
    pub async fn scope_estimate(
        &self,
        work_type: &str,
        gut_estimate: f64,
    ) -> ReportResult<ScopeEstimateReport> {
        if !gut_estimate.is_finite() || gut_estimate < 0.0 {
            return Err(ReportError::Invalid {
                field: "gut_estimate",
                message: format!("{} is not a non-negative number of hours", gut_estimate),
            });
        }

        let builder = QueryBuilder::new()
            .select(["Id", ESTIMATE, ACTUAL])
            .from_object(WORK_ITEM_OBJECT)
            .filter("Status__c", "=", "Done")?
            .filter("Type__c", "=", work_type)?
            .filter_not_null(ESTIMATE)
            .filter_not_null(ACTUAL)
            .limit(HISTORY_LIMIT)?;
        let rows = self.fetch(builder).await?;

        let estimate = RatioStatistics::compute(&rows, ESTIMATE, ACTUAL).map(|statistics| {
            ScopeEstimate {
                projection: statistics.project(gut_estimate),
                bias: statistics.bias(),
                statistics,
            }
        });

        Ok(ScopeEstimateReport {
            work_type: work_type.to_string(),
            gut_estimate,
            estimate,
        })
    }

    /// Items due today or in progress against a target number of hours
    ///
    /// Falls back to the configured target when none is given.
    pub async fn daily_budget(&self, target_hours: Option<f64>) -> ReportResult<DailyBudgetReport> {
        let target_hours = target_hours.unwrap_or(self.config.daily_target_hours);
        let today = self.today();

        let builder = QueryBuilder::new()
            .select([
                "Name",
                "Subject__c",
                "Status__c",
                "Priority__c",
                ESTIMATE,
                ACTUAL,
                "Due_Date__c",
                "Project__r.Name",
            ])
            .from_object(WORK_ITEM_OBJECT)
            .filter_raw(format!(
                "(Due_Date__c = {} OR Status__c = 'In Progress')",
                today.format("%Y-%m-%d")
            ))
            .filter("Status__c", "!=", "Done")?
            .order_by_dir("Priority__c", Direction::Asc)
            .order_by_dir("Due_Date__c", Direction::Asc)
            .limit(BUDGET_LIMIT)?;
        let items = self.fetch(builder).await?;

        Ok(DailyBudgetReport {
            date: today,
            target_hours,
            budget: DailyBudget::compute(&items, ESTIMATE, ACTUAL, target_hours),
            items,
        })
    }
}
