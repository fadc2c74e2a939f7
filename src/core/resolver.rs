//! Transform resolution: mapping entries → concrete column operations.
//!
//! Each `new_field: source` entry is decoded once, against a snapshot of the
//! table taken before the task runs, into a [`FieldOp`]. Operations are then
//! applied in mapping order; renamed-away sources are dropped at the end
//! unless the same task also wrote a column with that name.

use super::table::{Scalar, Table};
use super::types::Fault;
use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use serde_json::{Map, Value};

/// Decoded mapping value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Copy an existing column; the source is removed after the task.
    Rename(String),
    /// Row-wise concatenation of columns and literals.
    Concat(Vec<ConcatItem>),
    /// The same value on every row.
    Constant(Scalar),
}

/// One element of a `concat` list.
#[derive(Debug, Clone, PartialEq)]
pub enum ConcatItem {
    Column(String),
    Literal(String),
}

/// Decide whether a concat string that is not a column name is a literal.
///
/// A string counts as a literal when it is blank, at most three characters
/// long, starts or ends with whitespace, or contains one of `(`, `)`, `-`, `:`.
/// Anything else is taken to be a misspelled column reference. A real column
/// name of three characters or fewer is therefore indistinguishable from a
/// literal when it is missing from the table; this is part of the contract.
pub fn is_concat_literal(item: &str) -> bool {
    item.trim().is_empty()
        || item.chars().count() <= 3
        || item.starts_with(char::is_whitespace)
        || item.ends_with(char::is_whitespace)
        || item.contains(['(', ')', '-', ':'])
}

/// Decode every mapping entry against `snapshot`, in order.
pub fn decode_mapping(
    mapping: &Map<String, Value>,
    snapshot: &Table,
) -> Result<Vec<(String, FieldOp)>, Fault> {
    mapping
        .iter()
        .map(|(new_field, source)| Ok((new_field.clone(), decode_source(source, snapshot)?)))
        .collect()
}

fn decode_source(source: &Value, snapshot: &Table) -> Result<FieldOp, Fault> {
    match source {
        Value::String(name) => {
            if snapshot.has_column(name) {
                Ok(FieldOp::Rename(name.clone()))
            } else {
                Err(Fault::new(format!("Source field '{}' not found in data", name)))
            }
        }
        Value::Object(obj) => match obj.get("concat") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| decode_concat_item(item, snapshot))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldOp::Concat),
            Some(_) => Err(Fault::new("concat must be a list of fields")),
            None => Err(Fault::new(format!("Unknown transformation: {}", source))),
        },
        Value::Array(_) => Err(Fault::new(format!("Unknown transformation: {}", source))),
        scalar => Ok(FieldOp::Constant(Scalar::from_json(scalar))),
    }
}

fn decode_concat_item(item: &Value, snapshot: &Table) -> Result<ConcatItem, Fault> {
    match item {
        Value::String(s) if snapshot.has_column(s) => Ok(ConcatItem::Column(s.clone())),
        Value::String(s) if is_concat_literal(s) => Ok(ConcatItem::Literal(s.clone())),
        Value::String(s) => Err(Fault::new(format!("Field '{}' not found in data", s))),
        other => Ok(ConcatItem::Literal(other.to_string())),
    }
}

/// Apply decoded operations to `snapshot`, returning the transformed table.
pub fn apply_mapping(snapshot: &Table, ops: &[(String, FieldOp)]) -> Result<Table, Fault> {
    let mut result = snapshot.clone();
    let mut removals: IndexSet<&str> = IndexSet::new();
    let mut produced: FxHashSet<&str> = FxHashSet::default();

    for (new_field, op) in ops {
        let values = match op {
            FieldOp::Rename(source) => {
                removals.insert(source.as_str());
                snapshot_column(snapshot, source)?
            }
            FieldOp::Concat(items) => concat_rows(snapshot, items)?,
            FieldOp::Constant(value) => vec![value.clone(); snapshot.row_count()],
        };
        result.set_column(new_field, values)?;
        produced.insert(new_field.as_str());
    }

    for field in removals {
        if !produced.contains(field) {
            result.drop_column(field);
        }
    }
    Ok(result)
}

/// Decode and apply a raw mapping in one step.
pub fn resolve_transform(table: &Table, mapping: &Map<String, Value>) -> Result<Table, Fault> {
    let ops = decode_mapping(mapping, table)?;
    apply_mapping(table, &ops)
}

fn snapshot_column(snapshot: &Table, name: &str) -> Result<Vec<Scalar>, Fault> {
    snapshot
        .column(name)
        .map(|cells| cells.into_iter().cloned().collect())
        .ok_or_else(|| Fault::new(format!("Source field '{}' not found in data", name)))
}

fn concat_rows(snapshot: &Table, items: &[ConcatItem]) -> Result<Vec<Scalar>, Fault> {
    let mut out = vec![String::new(); snapshot.row_count()];
    for item in items {
        match item {
            ConcatItem::Literal(text) => {
                for s in &mut out {
                    s.push_str(text);
                }
            }
            ConcatItem::Column(name) => {
                let cells = snapshot
                    .column(name)
                    .ok_or_else(|| Fault::new(format!("Field '{}' not found in data", name)))?;
                for (s, cell) in out.iter_mut().zip(cells) {
                    s.push_str(&cell.to_string());
                }
            }
        }
    }
    Ok(out.into_iter().map(Scalar::Str).collect())
}
