//! Salesforce Record Source
//!
//! The seam between reports and the remote org. [`RecordSource`] is the
//! small surface reports need (query, create, update, describe);
//! [`SalesforceClient`] implements it over the REST API.

mod client;
mod error;

#[cfg(test)]
pub(crate) mod memory;

pub use client::SalesforceClient;
pub use error::{SalesforceError, SalesforceResult};

use crate::records::{flatten, FlatRecord, Record};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of Salesforce records
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Run a SOQL query and return every page of raw records
    async fn query_all(&self, soql: &str) -> SalesforceResult<Vec<Record>>;

    /// Create a record, returning its id
    async fn create(&self, object: &str, fields: Record) -> SalesforceResult<String>;

    /// Update fields on an existing record
    async fn update(&self, object: &str, id: &str, fields: Record) -> SalesforceResult<()>;

    /// Describe an object's schema
    async fn describe(&self, object: &str) -> SalesforceResult<ObjectDescription>;

    /// Run a SOQL query and flatten the results
    async fn query_flat(&self, soql: &str) -> SalesforceResult<Vec<FlatRecord>> {
        Ok(flatten(self.query_all(soql).await?))
    }
}

/// Object metadata from the describe endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescription {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub key_prefix: Option<String>,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub createable: bool,
    #[serde(default)]
    pub updateable: bool,
    #[serde(default)]
    pub fields: Vec<FieldDescription>,
    #[serde(default)]
    pub child_relationships: Vec<ChildRelationship>,
}

/// A field of a described object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default = "default_true")]
    pub nillable: bool,
    #[serde(default)]
    pub createable: bool,
    #[serde(default)]
    pub updateable: bool,
    #[serde(default)]
    pub picklist_values: Vec<PicklistValue>,
}

impl FieldDescription {
    /// Must be supplied on create
    pub fn is_required(&self) -> bool {
        !self.nillable && self.createable
    }
}

/// One picklist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicklistValue {
    pub value: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub default_value: bool,
}

/// A child relationship of a described object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRelationship {
    #[serde(rename = "relationshipName", default)]
    pub relationship_name: Option<String>,
    #[serde(rename = "childSObject")]
    pub child_object: String,
    pub field: String,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_payload() {
        let payload = json!({
            "name": "Work_Item__c",
            "label": "Work Item",
            "keyPrefix": "a01",
            "custom": true,
            "createable": true,
            "updateable": true,
            "fields": [
                {"name": "Status__c", "label": "Status", "type": "picklist",
                 "nillable": false, "createable": true, "updateable": true,
                 "picklistValues": [
                     {"value": "To Do", "active": true, "defaultValue": true},
                     {"value": "Legacy", "active": false, "defaultValue": false}
                 ]},
                {"name": "Id", "label": "Record ID", "type": "id",
                 "nillable": false, "createable": false, "updateable": false}
            ],
            "childRelationships": [
                {"relationshipName": "Time_Entries__r", "childSObject": "Time_Entry__c",
                 "field": "Work_Item__c"},
                {"relationshipName": null, "childSObject": "FeedItem", "field": "ParentId"}
            ]
        });

        let desc: ObjectDescription = serde_json::from_value(payload).unwrap();
        assert_eq!(desc.key_prefix.as_deref(), Some("a01"));
        assert_eq!(desc.fields.len(), 2);
        assert!(desc.fields[0].is_required());
        assert!(!desc.fields[1].is_required());
        assert_eq!(desc.fields[0].picklist_values.len(), 2);
        assert!(!desc.fields[0].picklist_values[1].active);
        assert_eq!(desc.child_relationships[0].child_object, "Time_Entry__c");
        assert_eq!(desc.child_relationships[1].relationship_name, None);
    }
}
