//! Flat result rows
//!
//! A [`FlatRecord`] maps dotted column names (`Project__r.Name`) to JSON
//! values, in the order the columns were first seen.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single flattened result row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord(Map<String, Value>);

impl FlatRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a column value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Builder method: add a column
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Get a column by exact key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check if a column is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Resolve a dotted path
    ///
    /// Tries the exact key first. Otherwise finds the longest key that is a
    /// dotted prefix of `path` and walks the remaining segments into that
    /// column's nested value. This reaches fields of relationships nested
    /// more than one level deep, which flattening leaves as opaque values.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }

        let segments: Vec<&str> = path.split('.').collect();
        for split in (1..segments.len()).rev() {
            let prefix = segments[..split].join(".");
            if let Some(mut current) = self.0.get(&prefix) {
                for segment in &segments[split..] {
                    current = current.as_object()?.get(*segment)?;
                }
                return Some(current);
            }
        }
        None
    }

    /// Numeric value of a column; numeric strings are parsed
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        match self.resolve(path)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String value of a column
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.resolve(path)?.as_str()
    }

    /// Date value of a column
    ///
    /// Accepts `YYYY-MM-DD` and datetime strings such as
    /// `2024-01-15T10:30:00.000+0000` (the time part is ignored).
    pub fn get_date(&self, path: &str) -> Option<NaiveDate> {
        let s = self.get_str(path)?.trim();
        let date_part = s.split('T').next().unwrap_or(s);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    /// Display label for a column, used as a grouping key
    ///
    /// `None` for missing and null values.
    pub fn label(&self, path: &str) -> Option<String> {
        match self.resolve(path)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Column names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Iterate over columns in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unwrap into the underlying map
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for FlatRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_accessors() {
        let record = FlatRecord::new()
            .with("Hours__c", 7.5)
            .with("Points__c", "3")
            .with("Name", "WI-1")
            .with("Date__c", "2024-01-15")
            .with("Completed__c", "2024-01-16T09:30:00.000+0000")
            .with("Blocked__c", true)
            .with("Notes__c", Value::Null);

        assert_eq!(record.get_f64("Hours__c"), Some(7.5));
        assert_eq!(record.get_f64("Points__c"), Some(3.0));
        assert_eq!(record.get_f64("Name"), None);
        assert_eq!(record.get_str("Name"), Some("WI-1"));
        assert_eq!(record.get_date("Date__c"), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(record.get_date("Completed__c"), NaiveDate::from_ymd_opt(2024, 1, 16));
        assert_eq!(record.get_date("Name"), None);
        assert_eq!(record.label("Blocked__c").as_deref(), Some("true"));
        assert_eq!(record.label("Hours__c").as_deref(), Some("7.5"));
        assert_eq!(record.label("Notes__c"), None);
        assert_eq!(record.label("Missing__c"), None);
    }

    #[test]
    fn test_resolve_into_opaque_nested_value() {
        let record = FlatRecord::new().with("Hours__c", 2).with(
            "Work_Item__r.Project__r",
            json!({"attributes": {"type": "Project__c"}, "Name": "Alpha"}),
        );

        assert_eq!(
            record.get_str("Work_Item__r.Project__r.Name"),
            Some("Alpha")
        );
        assert_eq!(record.resolve("Work_Item__r.Project__r.Missing"), None);
        assert_eq!(record.resolve("Other__r.Name"), None);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let record = FlatRecord::new().with("b", 1).with("a", 2).with("c", 3);
        let keys: Vec<&String> = record.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }
}
