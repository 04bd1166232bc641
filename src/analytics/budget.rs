//! Daily budget and burn rate

use super::stats::percent_of;
use super::Analysis;
use crate::records::FlatRecord;
use serde::Serialize;

/// Remaining budget below which a day counts as tight, in hours
pub const TIGHT_THRESHOLD_HOURS: f64 = 1.0;

/// How much room is left in the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Remaining work exceeds the target
    OverCommitted,
    /// Less than an hour of slack
    Tight,
    Slack,
}

impl BudgetStatus {
    /// Classify a remaining budget in hours
    pub fn classify(remaining_budget: f64) -> Self {
        if remaining_budget < 0.0 {
            Self::OverCommitted
        } else if remaining_budget < TIGHT_THRESHOLD_HOURS {
            Self::Tight
        } else {
            Self::Slack
        }
    }
}

/// Today's workload against a target number of hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBudget {
    /// Items on the plate
    pub items: usize,
    pub target_hours: f64,
    /// Sum of estimates; missing estimates count as 0
    pub estimated_total: f64,
    /// Sum of actuals; missing actuals count as 0
    pub actual_total: f64,
    /// `max(estimated_total - actual_total, 0)`
    pub remaining_work: f64,
    /// `target_hours - remaining_work`; negative when over-committed
    pub remaining_budget: f64,
    pub status: BudgetStatus,
}

impl DailyBudget {
    /// Compute the budget over today's items
    pub fn compute(
        rows: &[FlatRecord],
        estimate_col: &str,
        actual_col: &str,
        target_hours: f64,
    ) -> Analysis<Self> {
        if rows.is_empty() {
            return Analysis::NoData;
        }

        let estimated_total: f64 = rows.iter().filter_map(|r| r.get_f64(estimate_col)).sum();
        let actual_total: f64 = rows.iter().filter_map(|r| r.get_f64(actual_col)).sum();
        let remaining_work = (estimated_total - actual_total).max(0.0);
        let remaining_budget = target_hours - remaining_work;

        Analysis::Ready(Self {
            items: rows.len(),
            target_hours,
            estimated_total,
            actual_total,
            remaining_work,
            remaining_budget,
            status: BudgetStatus::classify(remaining_budget),
        })
    }
}

/// Share of the estimate already consumed, in percent
pub fn burn_rate_pct(actual: f64, estimated: f64) -> f64 {
    percent_of(actual, estimated)
}
