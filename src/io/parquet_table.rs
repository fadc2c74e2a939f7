//! Parquet reader/writer through Arrow record batches.
//!
//! Columns map to Arrow as Int64, Float64, Boolean or Utf8, all nullable.

use super::IoError;
use crate::core::table::{Scalar, Table};
use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float64Array, Float64Builder, Int64Array,
    Int64Builder, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Narrowest Arrow type holding every non-null cell. All-null columns are Utf8.
fn column_type(cells: &[&Scalar]) -> DataType {
    let present: Vec<&Scalar> = cells.iter().copied().filter(|c| !c.is_null()).collect();
    if present.is_empty() {
        return DataType::Utf8;
    }
    if present.iter().all(|c| matches!(c, Scalar::Int(_))) {
        DataType::Int64
    } else if present.iter().all(|c| c.is_numeric()) {
        DataType::Float64
    } else if present.iter().all(|c| matches!(c, Scalar::Bool(_))) {
        DataType::Boolean
    } else {
        DataType::Utf8
    }
}

fn build_array(cells: &[&Scalar], data_type: &DataType) -> ArrayRef {
    match data_type {
        DataType::Int64 => {
            let mut b = Int64Builder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Scalar::Int(i) => b.append_value(*i),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Float64 => {
            let mut b = Float64Builder::with_capacity(cells.len());
            for cell in cells {
                b.append_option(cell.as_f64());
            }
            Arc::new(b.finish())
        }
        DataType::Boolean => {
            let mut b = BooleanBuilder::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Scalar::Bool(v) => b.append_value(*v),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        _ => {
            let mut b = StringBuilder::new();
            for cell in cells {
                if cell.is_null() {
                    b.append_null();
                } else {
                    b.append_value(cell.to_string());
                }
            }
            Arc::new(b.finish())
        }
    }
}

/// Convert a table into one record batch.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch, IoError> {
    let mut fields = Vec::with_capacity(table.column_count());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.column_count());
    for name in table.columns() {
        let cells = table.column(name).unwrap_or_default();
        let data_type = column_type(&cells);
        arrays.push(build_array(&cells, &data_type));
        fields.push(Field::new(name.as_str(), data_type, true));
    }
    let schema = Arc::new(Schema::new(fields));
    if arrays.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Write `table` as a single-row-group Parquet file.
pub fn write_parquet(table: &Table, path: &Path) -> Result<(), IoError> {
    if table.column_count() == 0 {
        return Err(IoError::InvalidShape(
            "cannot write a table without columns as parquet".to_string(),
        ));
    }
    let batch = to_record_batch(table)?;
    let file = File::create(path).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Read a Parquet file whose columns are Int64, Float64, Boolean or Utf8.
pub fn read_parquet(path: &Path) -> Result<Table, IoError> {
    let file = File::open(path).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let mut columns: Vec<(String, Vec<Scalar>)> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| (f.name().clone(), Vec::new()))
        .collect();

    for batch in builder.build()? {
        let batch = batch?;
        for (i, (_, cells)) in columns.iter_mut().enumerate() {
            append_cells(batch.column(i), cells)?;
        }
    }
    Ok(Table::from_columns(columns)?)
}

fn append_cells(array: &ArrayRef, out: &mut Vec<Scalar>) -> Result<(), IoError> {
    let any = array.as_any();
    if let Some(a) = any.downcast_ref::<Int64Array>() {
        out.extend(a.iter().map(|v| v.map_or(Scalar::Null, Scalar::Int)));
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        out.extend(a.iter().map(|v| v.map_or(Scalar::Null, Scalar::Float)));
    } else if let Some(a) = any.downcast_ref::<BooleanArray>() {
        out.extend(a.iter().map(|v| v.map_or(Scalar::Null, Scalar::Bool)));
    } else if let Some(a) = any.downcast_ref::<StringArray>() {
        out.extend(a.iter().map(|v| v.map_or(Scalar::Null, Scalar::from)));
    } else {
        return Err(IoError::InvalidShape(format!(
            "unsupported parquet column type: {}",
            array.data_type()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::fixtures::sample_table;

    #[test]
    fn test_parquet_roundtrip_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.parquet");
        write_parquet(&sample_table(), &path).unwrap();
        assert_eq!(read_parquet(&path).unwrap(), sample_table());
    }

    #[test]
    fn test_parquet_column_types() {
        let table = Table::from_columns(vec![
            ("n".into(), vec![Scalar::Int(1), Scalar::Float(2.5), Scalar::Null]),
            ("mixed".into(), vec![Scalar::Int(1), Scalar::from("x"), Scalar::Bool(true)]),
            ("flag".into(), vec![Scalar::Bool(false), Scalar::Null, Scalar::Bool(true)]),
            ("empty".into(), vec![Scalar::Null, Scalar::Null, Scalar::Null]),
        ])
        .unwrap();
        let batch = to_record_batch(&table).unwrap();
        let types: Vec<_> = batch.schema().fields().iter().map(|f| f.data_type().clone()).collect();
        assert_eq!(
            types,
            vec![DataType::Float64, DataType::Utf8, DataType::Boolean, DataType::Utf8]
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("types.parquet");
        write_parquet(&table, &path).unwrap();
        let back = read_parquet(&path).unwrap();
        assert_eq!(back.cell(0, "n"), Some(&Scalar::Float(1.0)));
        assert_eq!(back.cell(2, "n"), Some(&Scalar::Null));
        assert_eq!(back.cell(2, "mixed"), Some(&Scalar::from("true")));
        assert_eq!(back.cell(1, "flag"), Some(&Scalar::Null));
        assert_eq!(back.cell(0, "empty"), Some(&Scalar::Null));
    }

    #[test]
    fn test_parquet_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.parquet");
        let table = Table::new(vec!["a".into()], vec![]).unwrap();
        write_parquet(&table, &path).unwrap();
        let back = read_parquet(&path).unwrap();
        assert_eq!(back.columns(), ["a".to_string()]);
        assert_eq!(back.row_count(), 0);
    }
}
