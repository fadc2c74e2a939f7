//! JSON reader/writer.
//!
//! Reads an array of records, JSON Lines, or an object of equal-length
//! column arrays. Writes pretty-printed records.

use super::IoError;
use crate::core::table::{Scalar, Table};
use indexmap::IndexSet;
use serde_json::{Map, Value};

pub fn read_json(text: &str) -> Result<Table, IoError> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => from_value(value),
        Err(e) => {
            // Fall back to JSON Lines: one record per non-empty line.
            let lines: Result<Vec<Value>, _> = text
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(serde_json::from_str)
                .collect();
            match lines {
                Ok(records) if records.len() > 1 => from_records(records),
                _ => Err(e.into()),
            }
        }
    }
}

fn from_value(value: Value) -> Result<Table, IoError> {
    match value {
        Value::Array(records) => from_records(records),
        Value::Object(columns) => {
            let columns = columns
                .into_iter()
                .map(|(name, values)| match values {
                    Value::Array(cells) => Ok((name, cells.iter().map(Scalar::from_json).collect())),
                    _ => Err(IoError::InvalidShape(format!("column '{}' is not an array", name))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Table::from_columns(columns)?)
        }
        _ => Err(IoError::InvalidShape(
            "expected an array of records or an object of columns".to_string(),
        )),
    }
}

fn from_records(records: Vec<Value>) -> Result<Table, IoError> {
    let mut objects = Vec::with_capacity(records.len());
    let mut columns: IndexSet<String> = IndexSet::new();
    for (i, record) in records.into_iter().enumerate() {
        let Value::Object(obj) = record else {
            return Err(IoError::InvalidShape(format!("record {} is not an object", i)));
        };
        columns.extend(obj.keys().cloned());
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map(Scalar::from_json).unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(Table::new(columns.into_iter().collect(), rows)?)
}

/// Render a table as a pretty-printed array of records.
pub fn write_json(table: &Table) -> Result<String, IoError> {
    let records: Vec<Value> = table
        .rows()
        .iter()
        .map(|row| {
            let obj: Map<String, Value> = table
                .columns()
                .iter()
                .cloned()
                .zip(row.iter().map(Scalar::to_json))
                .collect();
            Value::Object(obj)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}
