//! Reporting analytics over flat rows
//!
//! Pure transforms from `&[FlatRecord]` to typed, serializable results:
//!
//! - **Aggregate**: grouped counts/sums with an actual-vs-estimate ratio
//! - **Estimate**: historical ratio statistics and scope projection
//! - **Trend**: ISO-week buckets with a trailing rolling mean
//! - **Pivot**: two-dimension cross-tab with margins and utilization
//! - **Budget**: today's remaining budget and burn rate
//!
//! Every transform returns an [`Analysis`], which keeps "there was nothing
//! to analyze" apart from a result that happens to be zero. None of them
//! fail.

mod aggregate;
mod budget;
mod estimate;
mod pivot;
mod stats;
mod trend;

pub use aggregate::{
    AggregateColumn, AggregateKind, AggregateRow, AggregateTable, GroupedAggregation,
    OVERRUN_COLUMN, RATIO_COLUMN,
};
pub use budget::{burn_rate_pct, BudgetStatus, DailyBudget, TIGHT_THRESHOLD_HOURS};
pub use estimate::{
    EstimateBias, RatioStatistics, ScopeProjection, OVERRUN_THRESHOLD, UNDERRUN_THRESHOLD,
};
pub use pivot::{
    utilization_bar, ColumnKey, Pivot, PivotTable, Utilization, BAR_STEP_PCT,
    DEFAULT_DAILY_CAPACITY, TOTAL_LABEL,
};
pub use stats::{mean, median, percent_of, round_to, sample_stdev};
pub use trend::{
    rolling_mean, trend_markers, week_label, RollingTrend, Trend, WeekBucket, WeeklyTrend,
    DEFAULT_WINDOW,
};

use serde::Serialize;

/// Outcome of an analytics transform
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum Analysis<T> {
    /// Input was empty or had no qualifying rows
    NoData,
    /// Computed result
    Ready(T),
}

impl<T> Analysis<T> {
    /// Check for the no-data outcome
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    /// Convert into an `Option`
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::NoData => None,
            Self::Ready(value) => Some(value),
        }
    }

    /// Borrow the result
    pub fn as_ref(&self) -> Analysis<&T> {
        match self {
            Self::NoData => Analysis::NoData,
            Self::Ready(value) => Analysis::Ready(value),
        }
    }

    /// Transform the result, keeping `NoData` as is
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Analysis<U> {
        match self {
            Self::NoData => Analysis::NoData,
            Self::Ready(value) => Analysis::Ready(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Analysis<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NoData, Self::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_helpers() {
        let ready: Analysis<u32> = Analysis::Ready(3);
        assert!(!ready.is_no_data());
        assert_eq!(ready.as_ref().map(|v| v * 2), Analysis::Ready(6));
        assert_eq!(ready.into_option(), Some(3));

        let empty: Analysis<u32> = None.into();
        assert!(empty.is_no_data());
        assert_eq!(empty.map(|v| v + 1), Analysis::NoData);
    }

    #[test]
    fn test_no_data_distinct_from_zero() {
        let zero = Analysis::Ready(0.0);
        assert_ne!(zero, Analysis::NoData);
        assert_eq!(
            serde_json::to_value(&zero).unwrap(),
            serde_json::json!({"status": "ready", "result": 0.0})
        );
        assert_eq!(
            serde_json::to_value(Analysis::<f64>::NoData).unwrap(),
            serde_json::json!({"status": "no_data"})
        );
    }
}
