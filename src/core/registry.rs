//! Task registry: kind name → handler.
//!
//! Built once by the host and handed to the [`Interpreter`](super::executor::Interpreter).
//! Re-registering a kind replaces the earlier handler.

use super::table::Table;
use super::types::{Fault, Task};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

/// Table-to-table transformation for one task kind.
pub trait TaskHandler: Send + Sync {
    /// Run the task against an immutable snapshot and return the next table.
    fn run(&self, table: &Table, task: &Task) -> Result<Table, Fault>;
}

impl<F> TaskHandler for F
where
    F: Fn(&Table, &Task) -> Result<Table, Fault> + Send + Sync,
{
    fn run(&self, table: &Table, task: &Task) -> Result<Table, Fault> {
        self(table, task)
    }
}

/// Descriptive data shown by `aion tasks`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskMetadata {
    pub description: String,
    pub required_fields: Vec<String>,
}

impl TaskMetadata {
    pub fn new(description: &str, required_fields: &[&str]) -> Self {
        Self {
            description: description.to_string(),
            required_fields: required_fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Entry for a registered kind
#[derive(Clone)]
pub struct TaskEntry {
    pub handler: Arc<dyn TaskHandler>,
    pub metadata: TaskMetadata,
}

/// Registry of task handlers, in registration order.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    entries: IndexMap<String, TaskEntry, FxBuildHasher>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `kind`.
    pub fn register(
        &mut self,
        kind: &str,
        handler: impl TaskHandler + 'static,
        metadata: TaskMetadata,
    ) {
        self.register_arc(kind, Arc::new(handler), metadata);
    }

    /// Register an already-shared handler.
    pub fn register_arc(&mut self, kind: &str, handler: Arc<dyn TaskHandler>, metadata: TaskMetadata) {
        let entry = TaskEntry { handler, metadata };
        if self.entries.insert(kind.to_string(), entry).is_some() {
            tracing::debug!(kind, "replaced task handler");
        } else {
            tracing::debug!(kind, "registered task handler");
        }
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn TaskHandler>> {
        self.entries.get(kind).map(|e| Arc::clone(&e.handler))
    }

    pub fn metadata(&self, kind: &str) -> Option<&TaskMetadata> {
        self.entries.get(kind).map(|e| &e.metadata)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Registered kinds, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("kinds", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::fixtures::sample_table;
    use serde_json::Map;

    fn task(kind: &str) -> Task {
        Task {
            kind: kind.to_string(),
            config: Map::new(),
        }
    }

    fn identity(table: &Table, _task: &Task) -> Result<Table, Fault> {
        Ok(table.clone())
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut reg = TaskRegistry::new();
        assert!(reg.is_empty());
        reg.register("noop", identity, TaskMetadata::new("does nothing", &[]));
        assert!(reg.contains("noop"));
        assert_eq!(reg.len(), 1);
        let handler = reg.get("noop").unwrap();
        let out = handler.run(&sample_table(), &task("noop")).unwrap();
        assert_eq!(out, sample_table());
        assert!(reg.get("missing").is_none());
    }

    #[test]
    fn test_registry_overwrite_keeps_position() {
        let mut reg = TaskRegistry::new();
        reg.register("a", identity, TaskMetadata::default());
        reg.register("b", identity, TaskMetadata::default());
        reg.register(
            "a",
            |_: &Table, _: &Task| -> Result<Table, Fault> { Err(Fault::new("replaced")) },
            TaskMetadata::new("second", &["x"]),
        );
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.kinds().collect::<Vec<_>>(), vec!["a", "b"]);
        let err = reg.get("a").unwrap().run(&Table::empty(), &task("a")).unwrap_err();
        assert_eq!(err.message, "replaced");
        assert_eq!(reg.metadata("a").unwrap().required_fields, vec!["x"]);
    }

    #[test]
    fn test_registry_closure_handler() {
        let mut reg = TaskRegistry::new();
        let suffix = String::from("!");
        reg.register(
            "tag",
            move |t: &Table, _: &Task| -> Result<Table, Fault> {
                let values = vec![crate::core::table::Scalar::from(suffix.as_str()); t.row_count()];
                Ok(t.clone().with_column("tag", values)?)
            },
            TaskMetadata::default(),
        );
        let out = reg.get("tag").unwrap().run(&sample_table(), &task("tag")).unwrap();
        assert!(out.has_column("tag"));
    }
}
