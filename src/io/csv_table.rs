//! CSV reader/writer with per-column type inference.

use super::IoError;
use crate::core::table::{Scalar, Table};

/// Parse CSV text with a header row.
///
/// Each column is typed as a whole: int if every non-empty cell parses as an
/// integer, else float, else bool, else string. Empty cells become null.
pub fn read_csv(text: &str) -> Result<Table, IoError> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (i, column) in raw.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or_default().to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| (name, infer_column(&cells)))
        .collect();
    Ok(Table::from_columns(columns)?)
}

/// Render a table as CSV text. Nulls are written as empty cells.
pub fn write_csv(table: &Table) -> Result<String, IoError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| IoError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn infer_column(cells: &[String]) -> Vec<Scalar> {
    let present = || cells.iter().filter(|s| !s.is_empty());

    let convert: fn(&str) -> Scalar = if present().all(|s| s.parse::<i64>().is_ok()) {
        |s| s.parse().map(Scalar::Int).unwrap_or_default()
    } else if present().all(|s| s.parse::<f64>().is_ok()) {
        |s| s.parse().map(Scalar::Float).unwrap_or_default()
    } else if present().all(|s| parse_bool(s).is_some()) {
        |s| parse_bool(s).map(Scalar::Bool).unwrap_or_default()
    } else {
        |s| Scalar::Str(s.to_string())
    };

    cells
        .iter()
        .map(|s| if s.is_empty() { Scalar::Null } else { convert(s) })
        .collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_type_inference() {
        let table = read_csv("id,price,active,name,blank\n1,2.5,true,Ann,\n2,3,False,Bo,\n").unwrap();
        assert_eq!(table.columns(), &["id", "price", "active", "name", "blank"]);
        assert_eq!(table.cell(0, "id"), Some(&Scalar::Int(1)));
        assert_eq!(table.cell(1, "price"), Some(&Scalar::Float(3.0)));
        assert_eq!(table.cell(1, "active"), Some(&Scalar::Bool(false)));
        assert_eq!(table.cell(0, "name"), Some(&Scalar::from("Ann")));
        assert_eq!(table.cell(0, "blank"), Some(&Scalar::Null));
    }

    #[test]
    fn test_csv_mixed_column_is_string() {
        let table = read_csv("code\n12\nA7\n\n").unwrap();
        assert_eq!(table.cell(0, "code"), Some(&Scalar::from("12")));
        assert_eq!(table.cell(1, "code"), Some(&Scalar::from("A7")));
    }

    #[test]
    fn test_csv_header_only() {
        let table = read_csv("a,b\n").unwrap();
        assert_eq!(table.columns(), &["a", "b"]);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_csv_ragged_record_is_error() {
        assert!(matches!(read_csv("a,b\n1\n"), Err(IoError::Csv(_))));
    }

    #[test]
    fn test_csv_write_quotes_and_nulls() {
        let table = Table::new(
            vec!["text".into(), "n".into()],
            vec![vec![Scalar::from("a,b"), Scalar::Null]],
        )
        .unwrap();
        assert_eq!(write_csv(&table).unwrap(), "text,n\n\"a,b\",\n");
    }
}
