//! `aggregate`: group rows by key fields and reduce the others.
//!
//! Groups come out in ascending key order; rows with a null key are dropped.
//! Output columns are the group keys followed by each aggregation in
//! declaration order.

use super::decode;
use crate::core::table::{Scalar, Table};
use crate::core::types::{AggregateTask, Fault, Task};
use serde_json::Value;
use std::cmp::Ordering;

/// Reduction applied to one field within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Count,
    Nunique,
    First,
    Last,
    Std,
    Var,
}

impl AggFunc {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "sum" => Self::Sum,
            "mean" => Self::Mean,
            "median" => Self::Median,
            "min" => Self::Min,
            "max" => Self::Max,
            "count" => Self::Count,
            "nunique" => Self::Nunique,
            "first" => Self::First,
            "last" => Self::Last,
            "std" => Self::Std,
            "var" => Self::Var,
            _ => return None,
        })
    }

    /// Reduce the values of `field` for one group.
    pub fn apply(&self, field: &str, values: &[&Scalar]) -> Result<Scalar, Fault> {
        let present: Vec<&Scalar> = values.iter().copied().filter(|v| !v.is_null()).collect();
        Ok(match self {
            Self::Count => Scalar::Int(present.len() as i64),
            Self::Nunique => {
                let mut distinct: Vec<&Scalar> = Vec::new();
                for v in &present {
                    if !distinct.iter().any(|d| d.loosely_equals(v)) {
                        distinct.push(*v);
                    }
                }
                Scalar::Int(distinct.len() as i64)
            }
            Self::First => present.first().map(|v| (*v).clone()).unwrap_or_default(),
            Self::Last => present.last().map(|v| (*v).clone()).unwrap_or_default(),
            Self::Min => extreme(field, &present, Ordering::Less)?,
            Self::Max => extreme(field, &present, Ordering::Greater)?,
            Self::Sum => {
                if present.iter().all(|v| matches!(v, Scalar::Int(_))) {
                    let mut total: i64 = 0;
                    for v in &present {
                        if let Scalar::Int(i) = v {
                            match total.checked_add(*i) {
                                Some(t) => total = t,
                                None => return Ok(Scalar::Float(numbers(field, "sum", &present)?.iter().sum())),
                            }
                        }
                    }
                    Scalar::Int(total)
                } else {
                    Scalar::Float(numbers(field, "sum", &present)?.iter().sum())
                }
            }
            Self::Mean => {
                let xs = numbers(field, "mean", &present)?;
                mean(&xs).map(Scalar::Float).unwrap_or_default()
            }
            Self::Median => {
                let mut xs = numbers(field, "median", &present)?;
                xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                let n = xs.len();
                match n {
                    0 => Scalar::Null,
                    _ if n % 2 == 1 => Scalar::Float(xs[n / 2]),
                    _ => Scalar::Float((xs[n / 2 - 1] + xs[n / 2]) / 2.0),
                }
            }
            Self::Var => {
                let xs = numbers(field, "var", &present)?;
                sample_variance(&xs).map(Scalar::Float).unwrap_or_default()
            }
            Self::Std => {
                let xs = numbers(field, "std", &present)?;
                sample_variance(&xs)
                    .map(|v| Scalar::Float(v.sqrt()))
                    .unwrap_or_default()
            }
        })
    }
}

fn numbers(field: &str, func: &str, values: &[&Scalar]) -> Result<Vec<f64>, Fault> {
    values
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                Fault::new(format!(
                    "Cannot compute {} of non-numeric field '{}' ({} value)",
                    func,
                    field,
                    v.type_name()
                ))
            })
        })
        .collect()
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        None
    } else {
        Some(xs.iter().sum::<f64>() / xs.len() as f64)
    }
}

/// Variance with one degree of freedom removed; `None` below two values.
fn sample_variance(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    Some(xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64)
}

fn extreme(field: &str, values: &[&Scalar], want: Ordering) -> Result<Scalar, Fault> {
    let mut best: Option<&Scalar> = None;
    for v in values {
        best = match best {
            None => Some(*v),
            Some(b) => {
                let ord = v.compare(b).ok_or_else(|| {
                    Fault::new(format!(
                        "Cannot compare values of field '{}': {} vs {}",
                        field,
                        v.type_name(),
                        b.type_name()
                    ))
                })?;
                if ord == want {
                    Some(*v)
                } else {
                    Some(b)
                }
            }
        };
    }
    Ok(best.cloned().unwrap_or_default())
}

/// One output column: source field, reducer, output name.
struct Output {
    field: String,
    column: usize,
    func: AggFunc,
    name: String,
}

fn parse_outputs(table: &Table, aggregations: &serde_json::Map<String, Value>) -> Result<Vec<Output>, Fault> {
    let mut outputs = Vec::new();
    for (field, spec) in aggregations {
        let column = table
            .column_index(field)
            .ok_or_else(|| Fault::new(format!("Aggregation field '{}' not found in data", field)))?;
        let parse = |name: &str| {
            AggFunc::parse(name).ok_or_else(|| {
                Fault::new(format!("Unsupported aggregation '{}' for field '{}'", name, field))
            })
        };
        match spec {
            Value::String(name) => outputs.push(Output {
                field: field.clone(),
                column,
                func: parse(name)?,
                name: field.clone(),
            }),
            Value::Array(names) => {
                for name in names {
                    let name = name.as_str().ok_or_else(|| {
                        Fault::new(format!("Aggregation names for field '{}' must be strings", field))
                    })?;
                    outputs.push(Output {
                        field: field.clone(),
                        column,
                        func: parse(name)?,
                        name: format!("{}_{}", field, name),
                    });
                }
            }
            _ => {
                return Err(Fault::new(format!(
                    "Aggregation for field '{}' must be a function name or a list of names",
                    field
                )))
            }
        }
    }
    Ok(outputs)
}

/// Every non-null key value must be orderable against the others.
fn check_key_column(field: &str, keys: &[(Vec<Scalar>, usize)], pos: usize) -> Result<(), Fault> {
    let Some(first) = keys.first().map(|(k, _)| &k[pos]) else {
        return Ok(());
    };
    for (key, _) in keys {
        if first.compare(&key[pos]).is_none() {
            return Err(Fault::new(format!(
                "Cannot group by field '{}': mixed {} and {} values",
                field,
                first.type_name(),
                key[pos].type_name()
            )));
        }
    }
    Ok(())
}

fn compare_keys(a: &[Scalar], b: &[Scalar]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.compare(y).unwrap_or(Ordering::Equal))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

pub fn run(table: &Table, task: &Task) -> Result<Table, Fault> {
    if table.is_empty() {
        return Ok(table.clone());
    }
    let AggregateTask {
        group_by,
        aggregations,
    } = decode(task)?;

    if group_by.is_empty() {
        return Err(Fault::new("Aggregate task must specify 'group_by' fields"));
    }
    if aggregations.is_empty() {
        return Err(Fault::new("Aggregate task must specify 'aggregations'"));
    }
    let key_columns = group_by
        .iter()
        .map(|f| {
            table
                .column_index(f)
                .ok_or_else(|| Fault::new(format!("Group by field '{}' not found in data", f)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = parse_outputs(table, &aggregations)?;

    // Row keys, skipping rows with any null key.
    let mut keyed: Vec<(Vec<Scalar>, usize)> = table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let key: Vec<Scalar> = key_columns.iter().map(|&c| row[c].clone()).collect();
            (!key.iter().any(Scalar::is_null)).then_some((key, i))
        })
        .collect();

    // Checked up front so the sort comparator below is total.
    for (pos, field) in group_by.iter().enumerate() {
        check_key_column(field, &keyed, pos)?;
    }
    keyed.sort_by(|a, b| compare_keys(&a.0, &b.0));

    let mut groups: Vec<(Vec<Scalar>, Vec<usize>)> = Vec::new();
    for (key, row) in keyed {
        let same = groups
            .last()
            .is_some_and(|(k, _)| compare_keys(k, &key) == Ordering::Equal);
        match groups.last_mut() {
            Some((_, rows)) if same => rows.push(row),
            _ => groups.push((key, vec![row])),
        }
    }

    let mut columns: Vec<(String, Vec<Scalar>)> = group_by
        .iter()
        .enumerate()
        .map(|(i, f)| (f.clone(), groups.iter().map(|(k, _)| k[i].clone()).collect()))
        .collect();
    for out in &outputs {
        let values = groups
            .iter()
            .map(|(_, rows)| {
                let cells: Vec<&Scalar> = rows.iter().map(|&r| &table.rows()[r][out.column]).collect();
                out.func.apply(&out.field, &cells)
            })
            .collect::<Result<Vec<_>, _>>()?;
        columns.push((out.name.clone(), values));
    }

    let result = Table::from_columns(columns)?;
    tracing::debug!(groups = result.row_count(), "aggregated rows");
    Ok(result)
}
