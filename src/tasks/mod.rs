//! Built-in task handlers.
//!
//! Every handler returns its input unchanged when the table is empty, without
//! looking at field names.

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod model_call;
pub mod sort;
pub mod transform;

use crate::core::registry::{TaskMetadata, TaskRegistry};
use crate::core::types::{Fault, Task, TaskKind};
use crate::io::TableSink;
use crate::provider::ProviderRegistry;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Registry with all six built-in kinds.
pub fn default_registry(providers: Arc<ProviderRegistry>, sink: Arc<dyn TableSink>) -> TaskRegistry {
    let mut reg = TaskRegistry::new();
    reg.register(
        TaskKind::Filter.as_str(),
        filter::run,
        TaskMetadata::new("Keep rows matching a condition", &["condition"]),
    );
    reg.register(
        TaskKind::Sort.as_str(),
        sort::run,
        TaskMetadata::new("Order rows by one field", &["operation"]),
    );
    reg.register(
        TaskKind::Transform.as_str(),
        transform::run,
        TaskMetadata::new("Rename, concatenate, or set fields", &["mapping"]),
    );
    reg.register(
        TaskKind::ModelCall.as_str(),
        model_call::ModelCall::new(providers),
        TaskMetadata::new("Run a model provider over rows", &["prompt"]),
    );
    reg.register(
        TaskKind::Aggregate.as_str(),
        aggregate::run,
        TaskMetadata::new("Group rows and reduce fields", &["group_by", "aggregations"]),
    );
    reg.register(
        TaskKind::Export.as_str(),
        export::Export::new(sink),
        TaskMetadata::new("Write the current table to a file", &["file_path"]),
    );
    reg
}

/// Decode a task's raw config into its typed form.
pub(crate) fn decode<T: DeserializeOwned>(task: &Task) -> Result<T, Fault> {
    serde_json::from_value(serde_json::Value::Object(task.config.clone()))
        .map_err(|e| Fault::new(format!("Invalid {} task: {}", task.kind, e)))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SortTask;
    use crate::io::FileSink;
    use serde_json::json;

    #[test]
    fn test_tasks_default_registry_has_all_kinds() {
        let reg = default_registry(Arc::new(ProviderRegistry::new()), Arc::new(FileSink));
        let kinds: Vec<_> = reg.kinds().collect();
        assert_eq!(
            kinds,
            vec!["filter", "sort", "transform", "model_call", "aggregate", "export"]
        );
        assert_eq!(
            reg.metadata("aggregate").unwrap().required_fields,
            vec!["group_by", "aggregations"]
        );
    }

    #[test]
    fn test_tasks_decode_error_names_kind() {
        let t = test_util::task(json!({"task": "sort", "operation": {"order": "asc"}}));
        let err = decode::<SortTask>(&t).unwrap_err();
        assert!(err.message.starts_with("Invalid sort task:"), "{}", err);
    }
}
