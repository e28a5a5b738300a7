//! Typed business records.
//!
//! JSON payloads are converted into [`FieldValues`] once, at the gateway
//! boundary. Past that point every key is a catalog `&'static str`.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};

use fieldgate_auth::FieldAccess;
use fieldgate_core::{AppError, AppResult, RecordId};

use crate::catalog::{DataType, FieldDef, ResourceDef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(i64),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    fn from_json(field: &FieldDef, value: &JsonValue) -> AppResult<Self> {
        match (field.data_type, value) {
            (_, JsonValue::Null) => Ok(FieldValue::Null),
            (DataType::Text, JsonValue::String(s)) => Ok(FieldValue::Text(s.clone())),
            (DataType::Number, JsonValue::Number(n)) => n
                .as_i64()
                .map(FieldValue::Number)
                .ok_or_else(|| AppError::validation(format!("field '{}' expects an integer", field.name))),
            (expected, _) => Err(AppError::validation(format!(
                "field '{}' expects a {} value",
                field.name,
                expected.as_str()
            ))),
        }
    }
}

/// Column values keyed by catalog field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues(BTreeMap<&'static str, FieldValue>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a caller payload, keeping only catalog fields that `access`
    /// lets the caller edit. Everything else is dropped silently.
    pub fn from_payload(
        resource: &ResourceDef,
        payload: &JsonMap<String, JsonValue>,
        access: &FieldAccess,
    ) -> AppResult<Self> {
        let mut values = BTreeMap::new();
        for (key, raw) in payload {
            let Some(field) = resource.field(key) else { continue };
            if !access.can_edit(field.name) {
                continue;
            }
            values.insert(field.name, FieldValue::from_json(field, raw)?);
        }
        Ok(Self(values))
    }

    pub fn insert(&mut self, field: &'static str, value: FieldValue) {
        self.0.insert(field, value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    /// Required fields absent (or null), in catalog order.
    pub fn missing_required(&self, resource: &ResourceDef) -> Vec<String> {
        resource
            .required_fields()
            .filter(|f| self.get(f.name).is_none_or(FieldValue::is_null))
            .map(|f| f.name.to_string())
            .collect()
    }

    /// Required fields explicitly set to null, in catalog order.
    pub fn nulled_required(&self, resource: &ResourceDef) -> Vec<String> {
        resource
            .required_fields()
            .filter(|f| self.get(f.name).is_some_and(FieldValue::is_null))
            .map(|f| f.name.to_string())
            .collect()
    }

    /// Overwrite `self` with every value present in `changes`.
    pub fn merge(&mut self, changes: &FieldValues) {
        for (k, v) in changes.iter() {
            self.0.insert(k, v.clone());
        }
    }
}

/// One business row as returned by `List`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub values: FieldValues,
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (k, v) in self.values.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
