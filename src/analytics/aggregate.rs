//! Grouped aggregation
//!
//! Partitions flat rows by a key column and computes count/sum columns per
//! partition, optionally deriving an actual-vs-estimate ratio:
//!
//! ```text
//! Type__c | items | total_estimated | total_actual | accuracy_pct | overrun_pct
//! Bug     |     2 |            10.0 |         12.0 |        120.0 |        20.0
//! ```

use super::stats::{percent_of, round_to};
use super::Analysis;
use crate::records::FlatRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Name of the derived ratio column
pub const RATIO_COLUMN: &str = "accuracy_pct";

/// Name of the derived overrun column (`ratio - 100`)
pub const OVERRUN_COLUMN: &str = "overrun_pct";

/// Aggregate kinds supported per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    /// Number of non-null values
    Count,
    /// Sum of numeric values
    Sum,
}

impl AggregateKind {
    fn apply(&self, rows: &[&FlatRecord], source: &str) -> f64 {
        match self {
            Self::Count => rows
                .iter()
                .filter(|r| r.resolve(source).map(|v| !v.is_null()).unwrap_or(false))
                .count() as f64,
            Self::Sum => rows.iter().filter_map(|r| r.get_f64(source)).sum(),
        }
    }
}

impl std::fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
            Self::Sum => write!(f, "sum"),
        }
    }
}

/// One aggregate output column
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumn {
    /// Input column to aggregate
    pub source: String,
    /// Aggregate to apply
    pub kind: AggregateKind,
    /// Output column name
    pub name: String,
}

/// Grouped aggregation plan
#[derive(Debug, Clone)]
pub struct GroupedAggregation {
    key: String,
    columns: Vec<AggregateColumn>,
    ratio: Option<(String, String)>,
}

impl GroupedAggregation {
    /// Group by the given key column
    pub fn by(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            columns: Vec::new(),
            ratio: None,
        }
    }

    /// Add a count column
    pub fn count(mut self, source: impl Into<String>, name: impl Into<String>) -> Self {
        self.columns.push(AggregateColumn {
            source: source.into(),
            kind: AggregateKind::Count,
            name: name.into(),
        });
        self
    }

    /// Add a sum column
    pub fn sum(mut self, source: impl Into<String>, name: impl Into<String>) -> Self {
        self.columns.push(AggregateColumn {
            source: source.into(),
            kind: AggregateKind::Sum,
            name: name.into(),
        });
        self
    }

    /// Derive `actual / estimated * 100` from two output columns
    ///
    /// Only emitted when both named columns are aggregates of this plan.
    pub fn ratio(mut self, actual: impl Into<String>, estimated: impl Into<String>) -> Self {
        self.ratio = Some((actual.into(), estimated.into()));
        self
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Run the aggregation
    ///
    /// Rows with a null or missing key are skipped. Groups come back sorted
    /// by key.
    pub fn apply(&self, rows: &[FlatRecord]) -> Analysis<AggregateTable> {
        let mut groups: BTreeMap<String, Vec<&FlatRecord>> = BTreeMap::new();
        for row in rows {
            if let Some(key) = row.label(&self.key) {
                groups.entry(key).or_default().push(row);
            }
        }

        if groups.is_empty() {
            return Analysis::NoData;
        }

        let ratio = self
            .ratio
            .as_ref()
            .filter(|(actual, estimated)| self.has_column(actual) && self.has_column(estimated));

        let mut columns: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        if ratio.is_some() {
            columns.push(RATIO_COLUMN.to_string());
            columns.push(OVERRUN_COLUMN.to_string());
        }

        let rows = groups
            .into_iter()
            .map(|(key, members)| {
                let mut row = AggregateRow {
                    key,
                    values: Map::new(),
                };
                for column in &self.columns {
                    row.insert(&column.name, column.kind.apply(&members, &column.source));
                }

                if let Some((actual, estimated)) = ratio {
                    let pct = round_to(
                        percent_of(
                            row.get(actual).unwrap_or(0.0),
                            row.get(estimated).unwrap_or(0.0),
                        ),
                        1,
                    );
                    row.insert(RATIO_COLUMN, pct);
                    row.insert(OVERRUN_COLUMN, round_to(pct - 100.0, 1));
                }

                row
            })
            .collect();

        Analysis::Ready(AggregateTable {
            key_column: self.key.clone(),
            columns,
            rows,
        })
    }
}

/// Output of a grouped aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    /// Name of the grouping column
    pub key_column: String,
    /// Value column names, in plan order
    pub columns: Vec<String>,
    /// One row per group, sorted by key
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    /// Find the row for a group key
    pub fn row(&self, key: &str) -> Option<&AggregateRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Total of one value column across all groups
    pub fn column_total(&self, column: &str) -> f64 {
        self.rows.iter().filter_map(|r| r.get(column)).sum()
    }
}

/// One group of a grouped aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// Group key
    pub key: String,
    /// Values keyed by column name, in plan order
    pub values: Map<String, Value>,
}

impl AggregateRow {
    /// Get a value by column name
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).and_then(Value::as_f64)
    }

    fn insert(&mut self, column: &str, value: f64) {
        self.values.insert(column.to_string(), Value::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn item(kind: &str, estimated: f64, actual: f64) -> FlatRecord {
        FlatRecord::new()
            .with("Id", format!("{}-{}", kind, estimated))
            .with("Type__c", kind)
            .with("Estimated_Hours__c", estimated)
            .with("Actual_Hours__c", actual)
    }

    fn accuracy_plan() -> GroupedAggregation {
        GroupedAggregation::by("Type__c")
            .count("Id", "items")
            .sum("Estimated_Hours__c", "total_estimated")
            .sum("Actual_Hours__c", "total_actual")
            .ratio("total_actual", "total_estimated")
    }

    #[test]
    fn test_grouped_counts_and_sums() {
        let rows = vec![
            item("Feature", 10.0, 8.0),
            item("Bug", 4.0, 6.0),
            item("Bug", 6.0, 6.0),
        ];

        let table = accuracy_plan().apply(&rows).into_option().unwrap();

        assert_eq!(
            table.columns,
            vec!["items", "total_estimated", "total_actual", RATIO_COLUMN, OVERRUN_COLUMN]
        );
        let keys: Vec<&str> = table.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["Bug", "Feature"]);

        let bug = table.row("Bug").unwrap();
        assert_eq!(bug.get("items"), Some(2.0));
        assert_eq!(bug.get("total_estimated"), Some(10.0));
        assert_eq!(bug.get("total_actual"), Some(12.0));
        assert_eq!(bug.get(RATIO_COLUMN), Some(120.0));
        assert_eq!(bug.get(OVERRUN_COLUMN), Some(20.0));

        let feature = table.row("Feature").unwrap();
        assert_eq!(feature.get(RATIO_COLUMN), Some(80.0));
        assert_eq!(feature.get(OVERRUN_COLUMN), Some(-20.0));

        assert_eq!(table.column_total("total_actual"), 20.0);
    }

    #[test]
    fn test_ratio_rounded_to_one_decimal() {
        let rows = vec![item("Task", 3.0, 1.0)];
        let table = accuracy_plan().apply(&rows).into_option().unwrap();
        assert_eq!(table.rows[0].get(RATIO_COLUMN), Some(33.3));
        assert_eq!(table.rows[0].get(OVERRUN_COLUMN), Some(-66.7));
    }

    #[test]
    fn test_zero_denominator_ratio_is_zero() {
        let rows = vec![item("Spike", 0.0, 5.0)];
        let table = accuracy_plan().apply(&rows).into_option().unwrap();
        assert_eq!(table.rows[0].get(RATIO_COLUMN), Some(0.0));
    }

    #[test]
    fn test_ratio_omitted_without_components() {
        let rows = vec![item("Bug", 1.0, 1.0)];
        let table = GroupedAggregation::by("Type__c")
            .count("Id", "items")
            .ratio("total_actual", "total_estimated")
            .apply(&rows)
            .into_option()
            .unwrap();
        assert_eq!(table.columns, vec!["items"]);
        assert_eq!(table.rows[0].get(RATIO_COLUMN), None);
    }

    #[test]
    fn test_count_skips_nulls_and_null_keys_skipped() {
        let rows = vec![
            FlatRecord::new().with("Type__c", "Bug").with("Id", Value::Null),
            FlatRecord::new().with("Type__c", "Bug").with("Id", "a1"),
            FlatRecord::new().with("Type__c", Value::Null).with("Id", "a2"),
            FlatRecord::new().with("Id", "a3"),
        ];
        let table = GroupedAggregation::by("Type__c")
            .count("Id", "items")
            .apply(&rows)
            .into_option()
            .unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("items"), Some(1.0));
    }

    #[test]
    fn test_group_by_relationship_column() {
        let rows = vec![
            FlatRecord::new().with("Project__r.Name", "Alpha").with("Id", "1"),
            FlatRecord::new().with("Project__r.Name", "Beta").with("Id", "2"),
            FlatRecord::new().with("Project__r.Name", "Alpha").with("Id", "3"),
        ];
        let table = GroupedAggregation::by("Project__r.Name")
            .count("Id", "items")
            .apply(&rows)
            .into_option()
            .unwrap();
        assert_eq!(table.row("Alpha").unwrap().get("items"), Some(2.0));
        assert_eq!(table.row("Beta").unwrap().get("items"), Some(1.0));
    }

    #[test]
    fn test_row_json_keeps_plan_order() {
        let rows = vec![item("Bug", 4.0, 6.0)];
        let table = accuracy_plan().apply(&rows).into_option().unwrap();

        let json = serde_json::to_value(&table.rows[0]).unwrap();
        let keys: Vec<&str> = json["values"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, table.columns);

        let text = serde_json::to_string(&table).unwrap();
        assert!(text.find("\"items\"").unwrap() < text.find("\"overrun_pct\"").unwrap());
    }

    #[test]
    fn test_empty_input_is_no_data() {
        assert!(accuracy_plan().apply(&[]).is_no_data());
    }
}
