//! Pivot summarization
//!
//! Cross-tabulates a numeric measure by two dimensions, with margins:
//!
//! ```text
//!             Mon 01/08  Tue 01/09  TOTAL
//! Alpha             6.0        2.0    8.0
//! Beta              1.0        4.0    5.0
//! TOTAL             7.0        6.0   13.0
//! ```
//!
//! The utilization view turns each column total into a share of a daily
//! capacity with a `#` bar (one glyph per 5%).

use super::stats::percent_of;
use super::Analysis;
use crate::records::FlatRecord;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Label of the margin row and column
pub const TOTAL_LABEL: &str = "TOTAL";

/// Default daily capacity in hours
pub const DEFAULT_DAILY_CAPACITY: f64 = 8.0;

/// Percentage points per bar glyph
pub const BAR_STEP_PCT: f64 = 5.0;

/// How column labels are derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKey {
    /// The column's value as-is; columns sorted lexicographically
    Value(String),
    /// Calendar-day label (`Mon 01/08`) of a date column; columns sorted
    /// chronologically
    Day(String),
}

impl ColumnKey {
    /// Returns `(sort_key, label)` for a row
    fn extract(&self, row: &FlatRecord) -> Option<(String, String)> {
        match self {
            Self::Value(column) => row.label(column).map(|label| (label.clone(), label)),
            Self::Day(column) => row.get_date(column).map(|date| {
                (
                    date.format("%Y-%m-%d").to_string(),
                    date.format("%a %m/%d").to_string(),
                )
            }),
        }
    }
}

/// Pivot plan
#[derive(Debug, Clone)]
pub struct Pivot {
    row_key: String,
    column_key: ColumnKey,
    measure: String,
}

impl Pivot {
    /// Create a pivot of `measure` by `row_key` × `column_key`
    pub fn new(row_key: impl Into<String>, column_key: ColumnKey, measure: impl Into<String>) -> Self {
        Self {
            row_key: row_key.into(),
            column_key,
            measure: measure.into(),
        }
    }

    /// Build the table
    ///
    /// Rows missing either dimension are skipped; a missing measure counts
    /// as 0.
    pub fn apply(&self, rows: &[FlatRecord]) -> Analysis<PivotTable> {
        let mut row_keys: BTreeMap<String, ()> = BTreeMap::new();
        let mut column_order: BTreeMap<String, String> = BTreeMap::new();
        let mut sums: HashMap<(String, String), f64> = HashMap::new();

        for row in rows {
            let Some(row_label) = row.label(&self.row_key) else {
                continue;
            };
            let Some((sort_key, column_label)) = self.column_key.extract(row) else {
                continue;
            };
            let value = row.get_f64(&self.measure).unwrap_or(0.0);

            row_keys.insert(row_label.clone(), ());
            column_order.entry(sort_key).or_insert_with(|| column_label.clone());
            *sums.entry((row_label, column_label)).or_insert(0.0) += value;
        }

        if row_keys.is_empty() {
            return Analysis::NoData;
        }

        let row_keys: Vec<String> = row_keys.into_keys().collect();
        let mut column_keys: Vec<String> = Vec::new();
        for label in column_order.into_values() {
            if !column_keys.contains(&label) {
                column_keys.push(label);
            }
        }

        let cells: Vec<Vec<f64>> = row_keys
            .iter()
            .map(|r| {
                column_keys
                    .iter()
                    .map(|c| sums.get(&(r.clone(), c.clone())).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        let row_totals: Vec<f64> = cells.iter().map(|row| row.iter().sum()).collect();
        let column_totals: Vec<f64> = (0..column_keys.len())
            .map(|j| cells.iter().map(|row| row[j]).sum())
            .collect();
        let grand_total = row_totals.iter().sum();

        Analysis::Ready(PivotTable {
            row_dimension: self.row_key.clone(),
            row_keys,
            column_keys,
            cells,
            row_totals,
            column_totals,
            grand_total,
        })
    }
}

/// A pivot table with margins
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    /// Name of the row dimension
    pub row_dimension: String,
    /// Row labels, sorted
    pub row_keys: Vec<String>,
    /// Column labels, in display order
    pub column_keys: Vec<String>,
    /// `cells[row][column]`, missing combinations filled with 0
    pub cells: Vec<Vec<f64>>,
    /// Sum across each row
    pub row_totals: Vec<f64>,
    /// Sum down each column
    pub column_totals: Vec<f64>,
    /// Sum of all cells
    pub grand_total: f64,
}

impl PivotTable {
    /// Look up a cell by labels; `TOTAL` addresses the margins
    pub fn value(&self, row: &str, column: &str) -> Option<f64> {
        let col_idx = self.column_keys.iter().position(|c| c == column);
        match (row == TOTAL_LABEL, column == TOTAL_LABEL) {
            (true, true) => Some(self.grand_total),
            (true, false) => col_idx.map(|j| self.column_totals[j]),
            (false, true) => self
                .row_keys
                .iter()
                .position(|r| r == row)
                .map(|i| self.row_totals[i]),
            (false, false) => {
                let i = self.row_keys.iter().position(|r| r == row)?;
                Some(self.cells[i][col_idx?])
            }
        }
    }

    /// Share of a daily capacity used per column
    pub fn utilization(&self, capacity: f64) -> Vec<Utilization> {
        self.column_keys
            .iter()
            .zip(&self.column_totals)
            .map(|(label, hours)| Utilization::new(label.clone(), *hours, capacity))
            .collect()
    }
}

/// Utilization of one column against a capacity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utilization {
    pub label: String,
    pub hours: f64,
    pub capacity: f64,
    pub percent: f64,
    /// One `#` per 5 percentage points
    pub bar: String,
}

impl Utilization {
    /// Compute utilization of `hours` against `capacity`
    pub fn new(label: String, hours: f64, capacity: f64) -> Self {
        let percent = percent_of(hours, capacity);
        Self {
            label,
            hours,
            capacity,
            percent,
            bar: utilization_bar(percent),
        }
    }
}

/// Proportional bar, one `#` per 5 percentage points
pub fn utilization_bar(percent: f64) -> String {
    let glyphs = (percent / BAR_STEP_PCT).floor().max(0.0) as usize;
    "#".repeat(glyphs)
}
