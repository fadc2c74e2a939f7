//! `sort`: stable single-field ordering.

use super::decode;
use crate::core::table::{Table, TableError};
use crate::core::types::{Fault, SortTask, Task};

pub fn run(table: &Table, task: &Task) -> Result<Table, Fault> {
    if table.is_empty() {
        return Ok(table.clone());
    }
    let SortTask { operation } = decode(task)?;
    let ascending = operation.order.to_lowercase() == "asc";
    table.sort_by(&operation.field, ascending).map_err(|e| match e {
        TableError::MissingColumn(f) => Fault::new(format!("Field '{}' not found in data", f)),
        other => Fault::from(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::fixtures::sample_table;
    use crate::core::table::Scalar;
    use crate::tasks::test_util::task;
    use serde_json::json;

    fn ids(t: &Table) -> Vec<Scalar> {
        t.column("id").unwrap().into_iter().cloned().collect()
    }

    #[test]
    fn test_sort_ascending_default() {
        let out = run(&sample_table(), &task(json!({"task": "sort", "operation": {"field": "score"}}))).unwrap();
        assert_eq!(ids(&out), vec![Scalar::Int(3), Scalar::Int(1), Scalar::Int(5), Scalar::Int(2), Scalar::Int(4)]);
    }

    #[test]
    fn test_sort_descending() {
        let out = run(
            &sample_table(),
            &task(json!({"task": "sort", "operation": {"field": "name", "order": "desc"}})),
        )
        .unwrap();
        assert_eq!(out.cell(0, "name"), Some(&Scalar::from("Eve")));
        assert_eq!(out.cell(4, "name"), Some(&Scalar::from("Alice")));
    }

    #[test]
    fn test_sort_is_stable() {
        let out = run(&sample_table(), &task(json!({"task": "sort", "operation": {"field": "status"}}))).unwrap();
        assert_eq!(ids(&out), vec![Scalar::Int(1), Scalar::Int(3), Scalar::Int(4), Scalar::Int(2), Scalar::Int(5)]);
    }

    #[test]
    fn test_sort_missing_field() {
        let err = run(&sample_table(), &task(json!({"task": "sort", "operation": {"field": "zip"}}))).unwrap_err();
        assert_eq!(err.message, "Field 'zip' not found in data");
    }

    #[test]
    fn test_sort_empty_table() {
        let empty = Table::new(vec!["a".into()], vec![]).unwrap();
        let out = run(&empty, &task(json!({"task": "sort", "operation": {"field": "zip"}}))).unwrap();
        assert_eq!(out, empty);
    }
}
