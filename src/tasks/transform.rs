//! `transform`: rename, concatenate, or set fields.

use super::decode;
use crate::core::resolver;
use crate::core::table::Table;
use crate::core::types::{Fault, Task, TransformTask};

pub fn run(table: &Table, task: &Task) -> Result<Table, Fault> {
    if table.is_empty() {
        return Ok(table.clone());
    }
    let TransformTask { mapping } = decode(task)?;
    let ops = resolver::decode_mapping(&mapping, table)?;
    tracing::debug!(entries = ops.len(), "resolved transform mapping");
    resolver::apply_mapping(table, &ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::fixtures::sample_table;
    use crate::core::table::Scalar;
    use crate::tasks::test_util::task;
    use serde_json::json;

    #[test]
    fn test_transform_mixed_mapping() {
        let out = run(
            &sample_table(),
            &task(json!({"task": "transform", "mapping": {
                "full_name": "name",
                "label": {"concat": ["id", ": ", "status"]},
                "source": 1
            }})),
        )
        .unwrap();
        assert_eq!(
            out.columns(),
            &["id", "age", "status", "score", "full_name", "label", "source"]
        );
        assert_eq!(out.cell(1, "label"), Some(&Scalar::from("2: inactive")));
        assert_eq!(out.cell(3, "source"), Some(&Scalar::Int(1)));
    }

    #[test]
    fn test_transform_failure_message() {
        let err = run(
            &sample_table(),
            &task(json!({"task": "transform", "mapping": {"x": {"concat": ["name", "nickname"]}}})),
        )
        .unwrap_err();
        assert_eq!(err.message, "Field 'nickname' not found in data");
    }

    #[test]
    fn test_transform_empty_table() {
        let out = run(
            &Table::empty(),
            &task(json!({"task": "transform", "mapping": {"x": "missing"}})),
        )
        .unwrap();
        assert!(out.is_empty());
    }
}
