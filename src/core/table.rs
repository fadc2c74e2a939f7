//! Table ADT: ordered rows over uniquely-named columns.
//!
//! Every operation either borrows the table and returns a fresh one, or consumes
//! it. Handlers never observe mutation performed outside their own invocation.

use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Convert a JSON value into a cell. Arrays and objects keep their compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            Value::String(s) => Self::Str(s.clone()),
            other => Self::Str(other.to_string()),
        }
    }

    /// Convert back to JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Str(s) => Value::String(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Numeric view of the cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }

    /// Order two cells of compatible types. Returns `None` for nulls and for
    /// mixed kinds (string vs number, bool vs string, ...).
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            _ => None,
        }
    }

    /// Value equality with numeric coercion (`2 == 2.0`). Nulls are never equal.
    pub fn loosely_equals(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        matches!(self.compare(other), Some(Ordering::Equal))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Float text in the same shape as Python's `repr`: always a decimal point or
/// exponent (`25.0`), signed two-digit exponents (`1e+16`, `1.5e-07`), and
/// `inf`/`nan`.
fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    // Debug switches to exponent form at the same magnitudes Python does.
    let text = format!("{:?}", x);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Structural errors raised by table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("column '{column}' has {found} values, table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Field '{0}' not found in data")]
    MissingColumn(String),
    #[error("cannot order values of field '{column}': {left} vs {right}")]
    Incomparable {
        column: String,
        left: &'static str,
        right: &'static str,
    },
}

/// Ordered rows over uniquely-named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

impl Table {
    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from column names and row-major values.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Self, TableError> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RaggedRow {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build a table from `(name, values)` columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<Scalar>)>) -> Result<Self, TableError> {
        let row_count = columns.first().map_or(0, |(_, v)| v.len());
        let mut table = Self {
            columns: Vec::with_capacity(columns.len()),
            rows: vec![Vec::with_capacity(columns.len()); row_count],
        };
        for (name, values) in columns {
            if table.has_column(&name) {
                return Err(TableError::DuplicateColumn(name));
            }
            table.set_column(&name, values)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Scalar>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Single cell lookup.
    pub fn cell(&self, row: usize, name: &str) -> Option<&Scalar> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Add a column, or overwrite an existing one in place.
    pub fn set_column(&mut self, name: &str, values: Vec<Scalar>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Consuming variant of [`Table::set_column`].
    pub fn with_column(mut self, name: &str, values: Vec<Scalar>) -> Result<Self, TableError> {
        self.set_column(name, values)?;
        Ok(self)
    }

    /// Remove a column. Returns false when it did not exist.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Keep the rows for which `pred` holds. The predicate may fail.
    pub fn filter_rows<E>(
        &self,
        mut pred: impl FnMut(&[Scalar]) -> Result<bool, E>,
    ) -> Result<Self, E> {
        let mut rows = Vec::new();
        for row in &self.rows {
            if pred(row)? {
                rows.push(row.clone());
            }
        }
        Ok(Self {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Stable sort on one column. Nulls go last in both directions.
    pub fn sort_by(&self, name: &str, ascending: bool) -> Result<Self, TableError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))?;

        // Reject mixed kinds up front so the comparator below is total.
        let mut first: Option<&Scalar> = None;
        for row in &self.rows {
            let cell = &row[idx];
            if cell.is_null() {
                continue;
            }
            match first {
                None => first = Some(cell),
                Some(f) if f.compare(cell).is_none() => {
                    return Err(TableError::Incomparable {
                        column: name.to_string(),
                        left: f.type_name(),
                        right: cell.type_name(),
                    });
                }
                Some(_) => {}
            }
        }

        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match (a[idx].is_null(), b[idx].is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = a[idx].compare(&b[idx]).unwrap_or(Ordering::Equal);
                if ascending {
                    ord
                } else {
                    ord.reverse()
                }
            }
        });
        Ok(Self {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_table;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_scalar_display() {
        assert_eq!(Scalar::Null.to_string(), "");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
        assert_eq!(Scalar::Float(25.0).to_string(), "25.0");
        assert_eq!(Scalar::Float(0.0001).to_string(), "0.0001");
        assert_eq!(Scalar::Float(1e16).to_string(), "1e+16");
        assert_eq!(Scalar::Float(1.5e-7).to_string(), "1.5e-07");
        assert_eq!(Scalar::Float(-2.5e120).to_string(), "-2.5e+120");
        assert_eq!(Scalar::Float(f64::NAN).to_string(), "nan");
        assert_eq!(Scalar::Float(f64::NEG_INFINITY).to_string(), "-inf");
    }

    #[test]
    fn test_table_new_rejects_duplicates() {
        let err = Table::new(vec!["a".into(), "a".into()], vec![]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".into()));
    }

    #[test]
    fn test_table_new_rejects_ragged_rows() {
        let err = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec![Scalar::Int(1)]],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::RaggedRow { row: 0, .. }));
    }

    #[test]
    fn test_table_is_empty() {
        assert!(Table::empty().is_empty());
        let no_rows = Table::new(vec!["a".into()], vec![]).unwrap();
        assert!(no_rows.is_empty());
        assert!(!sample_table().is_empty());
    }

    #[test]
    fn test_table_set_column_overwrites_in_place() {
        let mut t = sample_table();
        t.set_column("age", vec![Scalar::Int(0); 5]).unwrap();
        assert_eq!(t.columns()[2], "age");
        assert_eq!(t.cell(3, "age"), Some(&Scalar::Int(0)));
        assert_eq!(t.column_count(), 5);
    }

    #[test]
    fn test_table_set_column_length_mismatch() {
        let mut t = sample_table();
        let err = t.set_column("x", vec![Scalar::Null]).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { expected: 5, found: 1, .. }));
    }

    #[test]
    fn test_table_drop_column() {
        let mut t = sample_table();
        assert!(t.drop_column("name"));
        assert!(!t.drop_column("name"));
        assert_eq!(t.columns(), &["id", "age", "status", "score"]);
        assert_eq!(t.rows()[0].len(), 4);
    }

    #[test]
    fn test_table_sort_desc_nulls_last() {
        let t = Table::from_columns(vec![(
            "v".to_string(),
            vec![Scalar::Int(2), Scalar::Null, Scalar::Float(3.5), Scalar::Int(1)],
        )])
        .unwrap();
        let sorted = t.sort_by("v", false).unwrap();
        let values: Vec<_> = sorted.column("v").unwrap().into_iter().cloned().collect();
        assert_eq!(
            values,
            vec![Scalar::Float(3.5), Scalar::Int(2), Scalar::Int(1), Scalar::Null]
        );
    }

    #[test]
    fn test_table_sort_mixed_kinds_fails() {
        let t = Table::from_columns(vec![(
            "v".to_string(),
            vec![Scalar::Int(2), Scalar::from("x")],
        )])
        .unwrap();
        assert!(matches!(
            t.sort_by("v", true),
            Err(TableError::Incomparable { .. })
        ));
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::Int(25).to_string(), "25");
        assert_eq!(Scalar::Float(25.0).to_string(), "25.0");
        assert_eq!(Scalar::Float(0.5).to_string(), "0.5");
        assert_eq!(Scalar::Null.to_string(), "");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_scalar_json_conversion() {
        assert_eq!(Scalar::from_json(&serde_json::json!(3)), Scalar::Int(3));
        assert_eq!(Scalar::from_json(&serde_json::json!(1.5)), Scalar::Float(1.5));
        assert_eq!(
            Scalar::from_json(&serde_json::json!([1, 2])),
            Scalar::Str("[1,2]".into())
        );
        assert_eq!(Scalar::Float(f64::NAN).to_json(), Value::Null);
    }

    #[test]
    fn test_scalar_loose_equality() {
        assert!(Scalar::Int(2).loosely_equals(&Scalar::Float(2.0)));
        assert!(!Scalar::Null.loosely_equals(&Scalar::Null));
        assert!(!Scalar::from("2").loosely_equals(&Scalar::Int(2)));
    }

    proptest! {
        #[test]
        fn prop_sort_is_ordered_permutation(values in proptest::collection::vec(-1000i64..1000, 0..50)) {
            let cells: Vec<Scalar> = values.iter().copied().map(Scalar::Int).collect();
            let t = Table::from_columns(vec![("v".to_string(), cells)]).unwrap();
            let sorted = t.sort_by("v", true).unwrap();
            let out: Vec<i64> = sorted
                .column("v")
                .unwrap()
                .into_iter()
                .map(|c| match c { Scalar::Int(i) => *i, _ => unreachable!() })
                .collect();
            let mut expected = values.clone();
            expected.sort();
            prop_assert_eq!(out, expected);
        }
    }
}
