//! Relationship flattening
//!
//! Query results embed traversed relationships as nested objects tagged with
//! an `attributes` metadata entry:
//!
//! ```text
//! {"attributes": {...}, "Name": "WI-1",
//!  "Project__r": {"attributes": {...}, "Name": "Alpha"}}
//!     → {"Name": "WI-1", "Project__r.Name": "Alpha"}
//! ```
//!
//! Exactly one level is merged. A relationship nested inside a relationship
//! stays an opaque value under its one-level key; see
//! [`FlatRecord::resolve`] for reading through it.

use super::flat::FlatRecord;
use serde_json::{Map, Value};

/// Metadata entry present on every raw record and relationship object
pub const METADATA_FIELD: &str = "attributes";

/// A raw, nested result record
pub type Record = Map<String, Value>;

/// Check whether a value is a relationship sub-record
fn is_relationship(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.contains_key(METADATA_FIELD))
        .unwrap_or(false)
}

/// Flatten one record
pub fn flatten_record(record: Record) -> FlatRecord {
    let mut flat = FlatRecord::new();

    for (key, value) in record {
        if is_relationship(&value) {
            if let Value::Object(sub) = value {
                for (sub_key, sub_value) in sub {
                    if sub_key == METADATA_FIELD {
                        continue;
                    }
                    flat.insert(format!("{}.{}", key, sub_key), sub_value);
                }
            }
        } else if key == METADATA_FIELD {
            continue;
        } else {
            flat.insert(key, value);
        }
    }

    flat
}

/// Flatten a batch of records, preserving order
pub fn flatten(records: Vec<Record>) -> Vec<FlatRecord> {
    records.into_iter().map(flatten_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_flatten_relationship() {
        let raw = record(json!({
            "Name": "WI-1",
            "Project__r": {
                "attributes": {"type": "Project__c", "url": "/services/data/v59.0/sobjects/Project__c/a01"},
                "Name": "Alpha"
            }
        }));

        let flat = flatten_record(raw);
        let expected: FlatRecord = record(json!({
            "Name": "WI-1",
            "Project__r.Name": "Alpha"
        }))
        .into();

        assert_eq!(flat, expected);
        assert!(!flat.contains_key("Project__r.attributes"));
    }

    #[test]
    fn test_top_level_metadata_dropped() {
        let raw = record(json!({
            "attributes": {"type": "Work_Item__c"},
            "Id": "a0B1",
            "Estimated_Hours__c": 4.0
        }));

        let flat = flatten_record(raw);
        assert_eq!(flat.len(), 2);
        assert!(!flat.contains_key(METADATA_FIELD));
        assert_eq!(flat.get_f64("Estimated_Hours__c"), Some(4.0));
    }

    #[test]
    fn test_null_relationship_copied_unchanged() {
        let raw = record(json!({"Id": "a0B1", "Assigned_To__r": null}));
        let flat = flatten_record(raw);
        assert_eq!(flat.get("Assigned_To__r"), Some(&Value::Null));
    }

    #[test]
    fn test_untagged_object_copied_unchanged() {
        let raw = record(json!({"Id": "a0B1", "Address__c": {"city": "Oslo"}}));
        let flat = flatten_record(raw);
        assert_eq!(flat.get("Address__c"), Some(&json!({"city": "Oslo"})));
    }

    #[test]
    fn test_only_one_level_flattened() {
        let raw = record(json!({
            "attributes": {"type": "Time_Entry__c"},
            "Hours__c": 3.5,
            "Work_Item__r": {
                "attributes": {"type": "Work_Item__c"},
                "Project__r": {
                    "attributes": {"type": "Project__c"},
                    "Name": "Alpha"
                }
            }
        }));

        let flat = flatten_record(raw);
        let keys: Vec<&String> = flat.keys().collect();
        assert_eq!(keys, vec!["Hours__c", "Work_Item__r.Project__r"]);

        let nested = flat.get("Work_Item__r.Project__r").unwrap();
        assert!(nested.get(METADATA_FIELD).is_some());
        assert_eq!(flat.get_str("Work_Item__r.Project__r.Name"), Some("Alpha"));
    }

    #[test]
    fn test_flatten_batch_preserves_order() {
        let records = vec![
            record(json!({"attributes": {}, "Name": "WI-1"})),
            record(json!({"attributes": {}, "Name": "WI-2"})),
        ];
        let flat = flatten(records);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].get_str("Name"), Some("WI-1"));
        assert_eq!(flat[1].get_str("Name"), Some("WI-2"));
    }

    #[test]
    fn test_empty_input() {
        assert!(flatten(Vec::new()).is_empty());
    }
}
