//! Excel (xlsx) writer. One worksheet, bold header row, typed cells.

use super::IoError;
use crate::core::table::{Scalar, Table};
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook};
use std::path::Path;

fn row_num(i: usize) -> Result<RowNum, IoError> {
    RowNum::try_from(i).map_err(|_| IoError::InvalidShape(format!("row {} exceeds the xlsx limit", i)))
}

fn col_num(i: usize) -> Result<ColNum, IoError> {
    ColNum::try_from(i)
        .map_err(|_| IoError::InvalidShape(format!("column {} exceeds the xlsx limit", i)))
}

/// Write `table` to an xlsx workbook. Null cells are left blank.
pub fn write_xlsx(table: &Table, path: &Path) -> Result<(), IoError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    for (c, name) in table.columns().iter().enumerate() {
        sheet.write_string_with_format(0, col_num(c)?, name, &header)?;
    }
    for (r, row) in table.rows().iter().enumerate() {
        let r = row_num(r + 1)?;
        for (c, cell) in row.iter().enumerate() {
            let c = col_num(c)?;
            match cell {
                Scalar::Null => {}
                Scalar::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                Scalar::Int(i) => {
                    sheet.write_number(r, c, *i as f64)?;
                }
                Scalar::Float(x) => {
                    sheet.write_number(r, c, *x)?;
                }
                Scalar::Str(s) => {
                    sheet.write_string(r, c, s)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}
