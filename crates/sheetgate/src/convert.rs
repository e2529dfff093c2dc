use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sheetgate_spec::{ParamType, Schema};

use crate::table::TableView;

/// Typed cell value carried by a converted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl FieldValue {
    /// Best-effort conversion of a raw cell. Type validity has already been
    /// checked by the validator, so a residual failure falls back to the
    /// type's zero value rather than failing the export.
    fn parse_lossy(ty: ParamType, cell: &str) -> FieldValue {
        match ty {
            ParamType::String => FieldValue::Text(cell.to_string()),
            ParamType::Int => FieldValue::Int(cell.trim().parse().unwrap_or(0)),
            ParamType::Float => FieldValue::Float(cell.trim().parse().unwrap_or(0.0)),
        }
    }
}

/// One converted table row, keyed by parameter name in header order.
///
/// Serializes as a JSON object; a `Vec` of records is the exported array.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Map every data row to a typed record, preserving row order.
///
/// Only header columns with a matching schema parameter contribute; columns
/// the schema does not know are silently skipped.
pub fn convert(schema: &Schema, table: &TableView) -> Vec<Record> {
    // Resolve each header column to its parameter once, not per row.
    let columns: Vec<(usize, &str, ParamType)> = table
        .header()
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            schema
                .param(name)
                .map(|param| (idx, name.as_str(), param.ty))
        })
        .collect();

    table
        .rows()
        .iter()
        .map(|row| Record {
            fields: columns
                .iter()
                .map(|&(idx, name, ty)| {
                    let cell = row.get(idx).map(String::as_str).unwrap_or("");
                    (name.to_string(), FieldValue::parse_lossy(ty, cell))
                })
                .collect(),
        })
        .collect()
}
