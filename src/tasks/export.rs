//! `export`: hand the current table to a [`TableSink`]; the table passes through.

use super::decode;
use crate::core::registry::TaskHandler;
use crate::core::table::Table;
use crate::core::types::{ExportTask, Fault, Task};
use crate::io::{TableFormat, TableSink};
use std::path::Path;
use std::sync::Arc;

pub struct Export {
    sink: Arc<dyn TableSink>,
}

impl Export {
    pub fn new(sink: Arc<dyn TableSink>) -> Self {
        Self { sink }
    }
}

impl TaskHandler for Export {
    fn run(&self, table: &Table, task: &Task) -> Result<Table, Fault> {
        if table.is_empty() {
            return Ok(table.clone());
        }
        let ExportTask { file_path, format } = decode(task)?;
        if file_path.is_empty() {
            return Err(Fault::new("Export task must specify 'file_path'"));
        }
        let format: TableFormat = format.parse()?;
        self.sink.write(table, Path::new(&file_path), format)?;
        tracing::info!(path = %file_path, %format, rows = table.row_count(), "exported table");
        Ok(table.clone())
    }
}
