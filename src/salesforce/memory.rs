//! In-memory record source for report tests

use super::{ObjectDescription, RecordSource, SalesforceError, SalesforceResult};
use crate::records::Record;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Canned responses keyed by a substring of the SOQL text
#[derive(Default)]
pub(crate) struct MemorySource {
    responses: Vec<(String, Vec<Record>)>,
    descriptions: HashMap<String, ObjectDescription>,
    queries: Mutex<Vec<String>>,
    created: Mutex<Vec<(String, Record)>>,
    updated: Mutex<Vec<(String, String, Record)>>,
}

impl MemorySource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `needle`; earlier registrations win
    pub(crate) fn on(mut self, needle: &str, records: Value) -> Self {
        self.responses.push((needle.to_string(), records_from(records)));
        self
    }

    pub(crate) fn with_description(mut self, description: ObjectDescription) -> Self {
        self.descriptions
            .insert(description.name.clone(), description);
        self
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub(crate) fn created(&self) -> Vec<(String, Record)> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn updated(&self) -> Vec<(String, String, Record)> {
        self.updated.lock().unwrap().clone()
    }
}

/// Convert a JSON array of objects into raw records
pub(crate) fn records_from(value: Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn query_all(&self, soql: &str) -> SalesforceResult<Vec<Record>> {
        self.queries.lock().unwrap().push(soql.to_string());
        Ok(self
            .responses
            .iter()
            .find(|(needle, _)| soql.contains(needle.as_str()))
            .map(|(_, records)| records.clone())
            .unwrap_or_default())
    }

    async fn create(&self, object: &str, fields: Record) -> SalesforceResult<String> {
        let mut created = self.created.lock().unwrap();
        created.push((object.to_string(), fields));
        Ok(format!("a0T{:015}", created.len()))
    }

    async fn update(&self, object: &str, id: &str, fields: Record) -> SalesforceResult<()> {
        self.updated
            .lock()
            .unwrap()
            .push((object.to_string(), id.to_string(), fields));
        Ok(())
    }

    async fn describe(&self, object: &str) -> SalesforceResult<ObjectDescription> {
        self.descriptions
            .get(object)
            .cloned()
            .ok_or_else(|| SalesforceError::Api {
                status: 404,
                message: format!("The requested resource does not exist: {}", object),
            })
    }
}
