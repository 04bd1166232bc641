//! Weekly rolling trend
//!
//! Buckets rows by ISO week, counts them, and smooths the counts with a
//! trailing rolling mean:
//!
//! ```text
//! week      count  rolling_avg  trend
//! 2024-W01      2         2.00  --
//! 2024-W02      5         3.50  ^ UP
//! 2024-W03      3         3.33  v DOWN
//! 2024-W04      3         3.25  = STABLE
//! ```

use super::stats::mean;
use super::Analysis;
use crate::records::FlatRecord;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Default trailing window, in buckets
pub const DEFAULT_WINDOW: usize = 4;

/// ISO week label, `YYYY-Www`
///
/// Labels sort lexicographically in chronological order.
pub fn week_label(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

/// Trailing rolling mean with a minimum window of one
///
/// Early positions average over however many values exist so far,
/// including the current one.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Movement of a bucket relative to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            Self::Up
        } else if current < previous {
            Self::Down
        } else {
            Self::Flat
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "^ UP"),
            Self::Down => write!(f, "v DOWN"),
            Self::Flat => write!(f, "= STABLE"),
        }
    }
}

/// Trend markers for a series; the first entry never has one
pub fn trend_markers(values: &[f64]) -> Vec<Option<Trend>> {
    (0..values.len())
        .map(|i| {
            if i == 0 {
                None
            } else {
                Some(Trend::between(values[i - 1], values[i]))
            }
        })
        .collect()
}

/// One week of the trend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekBucket {
    /// ISO week label
    pub label: String,
    /// Rows in the week
    pub count: usize,
    /// Sum of the measure column in the week
    pub total: f64,
    /// Trailing rolling mean of `count`
    pub rolling_avg: f64,
    /// Change from the previous week; `None` for the first
    pub trend: Option<Trend>,
}

/// Weekly trend series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTrend {
    /// Buckets in chronological order
    pub buckets: Vec<WeekBucket>,
    /// Mean of bucket counts
    pub average_count: f64,
}

/// Rolling trend computation over a date column
#[derive(Debug, Clone)]
pub struct RollingTrend {
    date_column: String,
    measure_column: String,
    window: usize,
}

impl RollingTrend {
    /// Bucket by `date_column`, summing `measure_column`
    pub fn new(date_column: impl Into<String>, measure_column: impl Into<String>) -> Self {
        Self {
            date_column: date_column.into(),
            measure_column: measure_column.into(),
            window: DEFAULT_WINDOW,
        }
    }

    /// Set the trailing window size
    pub fn window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Compute the trend
    ///
    /// Rows without a parseable date are skipped.
    pub fn apply(&self, rows: &[FlatRecord]) -> Analysis<WeeklyTrend> {
        let mut weeks: BTreeMap<String, (usize, f64)> = BTreeMap::new();
        for row in rows {
            let Some(date) = row.get_date(&self.date_column) else {
                continue;
            };
            let entry = weeks.entry(week_label(date)).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += row.get_f64(&self.measure_column).unwrap_or(0.0);
        }

        if weeks.is_empty() {
            return Analysis::NoData;
        }

        let counts: Vec<f64> = weeks.values().map(|(count, _)| *count as f64).collect();
        let rolling = rolling_mean(&counts, self.window);
        let markers = trend_markers(&counts);

        let buckets = weeks
            .into_iter()
            .zip(rolling.into_iter().zip(markers))
            .map(|((label, (count, total)), (rolling_avg, trend))| WeekBucket {
                label,
                count,
                total,
                rolling_avg,
                trend,
            })
            .collect();

        Analysis::Ready(WeeklyTrend {
            buckets,
            average_count: mean(&counts).unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done_on(date: &str, hours: f64) -> FlatRecord {
        FlatRecord::new()
            .with("Completed_Date__c", date)
            .with("Actual_Hours__c", hours)
    }

    #[test]
    fn test_week_label() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(week_label(d(2024, 1, 15)), "2024-W03");
        assert_eq!(week_label(d(2024, 3, 4)), "2024-W10");
        // ISO year differs from the calendar year at the boundary
        assert_eq!(week_label(d(2024, 12, 30)), "2025-W01");
        assert_eq!(week_label(d(2021, 1, 3)), "2020-W53");
    }

    #[test]
    fn test_rolling_mean_min_window() {
        let rolling = rolling_mean(&[2.0, 5.0, 3.0, 3.0], 4);
        let expected = [2.0, 3.5, 10.0 / 3.0, 3.25];
        for (got, want) in rolling.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
        }

        let rolling = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 4);
        assert_eq!(rolling[4], 3.5);
        assert_eq!(rolling[5], 4.5);
    }

    #[test]
    fn test_trend_markers() {
        assert_eq!(
            trend_markers(&[2.0, 5.0, 3.0, 3.0]),
            vec![None, Some(Trend::Up), Some(Trend::Down), Some(Trend::Flat)]
        );
        assert!(trend_markers(&[]).is_empty());
    }

    #[test]
    fn test_weekly_trend_from_rows() {
        // Weekly counts 2, 5, 3, 3 across ISO weeks 2024-W02..W05
        let mut rows = Vec::new();
        rows.extend((0..2).map(|_| done_on("2024-01-08", 1.0)));
        rows.extend((0..5).map(|_| done_on("2024-01-17T10:00:00.000+0000", 2.0)));
        rows.extend((0..3).map(|_| done_on("2024-01-24", 1.5)));
        rows.extend((0..3).map(|_| done_on("2024-02-02", 0.5)));
        rows.push(FlatRecord::new().with("Actual_Hours__c", 9.0));

        let trend = RollingTrend::new("Completed_Date__c", "Actual_Hours__c")
            .apply(&rows)
            .into_option()
            .unwrap();

        let labels: Vec<&str> = trend.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-W02", "2024-W03", "2024-W04", "2024-W05"]);

        let counts: Vec<usize> = trend.buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 5, 3, 3]);
        assert_eq!(trend.buckets[1].total, 10.0);

        let rolling: Vec<f64> = trend.buckets.iter().map(|b| b.rolling_avg).collect();
        assert!((rolling[2] - 3.33).abs() < 0.01);
        assert_eq!(rolling[3], 3.25);

        let markers: Vec<Option<Trend>> = trend.buckets.iter().map(|b| b.trend).collect();
        assert_eq!(
            markers,
            vec![None, Some(Trend::Up), Some(Trend::Down), Some(Trend::Flat)]
        );
        assert_eq!(trend.average_count, 3.25);
    }

    #[test]
    fn test_rows_without_dates_are_no_data() {
        let rows = vec![FlatRecord::new().with("Completed_Date__c", "not a date")];
        assert!(RollingTrend::new("Completed_Date__c", "Actual_Hours__c")
            .apply(&rows)
            .is_no_data());
        assert!(RollingTrend::new("Completed_Date__c", "Actual_Hours__c")
            .apply(&[])
            .is_no_data());
    }
}
