//! `filter`: keep rows whose field satisfies a condition.

use super::decode;
use crate::core::table::{Scalar, Table};
use crate::core::types::{Condition, Fault, FilterTask, Task};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

/// Supported comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "<" => Self::Lt,
            "<=" => Self::Le,
            "in" => Self::In,
            "not in" => Self::NotIn,
            "contains" => Self::Contains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            _ => return None,
        })
    }
}

/// A condition compiled against its right-hand value.
#[derive(Debug)]
enum Predicate {
    Equal(Scalar),
    NotEqual(Scalar),
    Order(Operator, Scalar),
    Member(Vec<Scalar>, bool),
    Pattern(Regex),
    Prefix(String),
    Suffix(String),
}

impl Predicate {
    fn compile(op: Operator, value: &Value) -> Result<Self, Fault> {
        let text = |name: &str| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Fault::new(format!("Operator '{}' requires a string value", name)))
        };
        Ok(match op {
            Operator::Eq => Self::Equal(Scalar::from_json(value)),
            Operator::Ne => Self::NotEqual(Scalar::from_json(value)),
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                Self::Order(op, Scalar::from_json(value))
            }
            Operator::In | Operator::NotIn => {
                let items = value.as_array().ok_or_else(|| {
                    let name = if op == Operator::In { "in" } else { "not in" };
                    Fault::new(format!("Operator '{}' requires a list value", name))
                })?;
                Self::Member(items.iter().map(Scalar::from_json).collect(), op == Operator::In)
            }
            Operator::Contains => {
                let pattern = text("contains")?;
                let re = Regex::new(&pattern)
                    .map_err(|e| Fault::new(format!("Invalid pattern '{}': {}", pattern, e)))?;
                Self::Pattern(re)
            }
            Operator::StartsWith => Self::Prefix(text("startswith")?),
            Operator::EndsWith => Self::Suffix(text("endswith")?),
        })
    }

    fn matches(&self, cell: &Scalar, field: &str) -> Result<bool, Fault> {
        Ok(match self {
            Self::Equal(v) => cell.loosely_equals(v),
            Self::NotEqual(v) => !cell.loosely_equals(v),
            Self::Order(op, v) => {
                if cell.is_null() {
                    return Ok(false);
                }
                let ord = cell.compare(v).ok_or_else(|| {
                    Fault::new(format!(
                        "Cannot compare field '{}' ({}) with {} value",
                        field,
                        cell.type_name(),
                        v.type_name()
                    ))
                })?;
                match op {
                    Operator::Gt => ord == Ordering::Greater,
                    Operator::Ge => ord != Ordering::Less,
                    Operator::Lt => ord == Ordering::Less,
                    _ => ord != Ordering::Greater,
                }
            }
            Self::Member(items, wanted) => items.iter().any(|i| cell.loosely_equals(i)) == *wanted,
            Self::Pattern(re) => cell.as_str().is_some_and(|s| re.is_match(s)),
            Self::Prefix(p) => cell.as_str().is_some_and(|s| s.starts_with(p.as_str())),
            Self::Suffix(p) => cell.as_str().is_some_and(|s| s.ends_with(p.as_str())),
        })
    }
}

/// Handler entry point.
pub fn run(table: &Table, task: &Task) -> Result<Table, Fault> {
    if table.is_empty() {
        return Ok(table.clone());
    }
    let FilterTask {
        condition: Condition { field, operator, value },
    } = decode(task)?;

    let op = Operator::parse(&operator)
        .ok_or_else(|| Fault::new(format!("Unsupported operator: {}", operator)))?;
    let idx = table
        .column_index(&field)
        .ok_or_else(|| Fault::new(format!("Field '{}' not found in data", field)))?;
    let predicate = Predicate::compile(op, &value)?;

    let out = table.filter_rows(|row| predicate.matches(&row[idx], &field))?;
    tracing::debug!(field = %field, operator = %operator, kept = out.row_count(), "filtered rows");
    Ok(out)
}
