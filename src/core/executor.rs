//! Pipeline executor: validate, then run each task in order, stopping at the
//! first failure.
//!
//! Idle → Validating → {Rejected | Running} → {Completed | Aborted}

use super::explainer;
use super::registry::TaskRegistry;
use super::table::Table;
use super::types::*;
use super::validator;
use crate::io::{FileSink, TableSink};
use crate::provider::ProviderRegistry;
use crate::tasks;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Runs programs against an injected task registry.
#[derive(Debug, Clone)]
pub struct Interpreter {
    registry: TaskRegistry,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter with the built-in tasks, the `simulate` provider, and file export.
    pub fn new() -> Self {
        let providers = Arc::new(ProviderRegistry::new());
        let sink: Arc<dyn TableSink> = Arc::new(FileSink);
        Self::with_registry(tasks::default_registry(providers, sink))
    }

    pub fn with_registry(registry: TaskRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TaskRegistry {
        &mut self.registry
    }

    pub fn validate(&self, program: &Value) -> Vec<ValidationError> {
        validator::validate_program(program)
    }

    pub fn explain(&self, program: &Value) -> String {
        explainer::explain(program)
    }

    /// Execute `program` against `input` (an empty table when absent).
    pub fn execute(&self, program: &Value, input: Option<Table>) -> ExecutionResult {
        let start = Instant::now();
        let mut state = RunState::Idle;

        transition(&mut state, RunState::Validating);
        let validation_errors = validator::validate_program(program);
        if !validation_errors.is_empty() {
            transition(&mut state, RunState::Rejected);
            tracing::warn!(errors = validation_errors.len(), "program rejected");
            return ExecutionResult {
                data: None,
                logs: Vec::new(),
                errors: validation_errors.iter().map(|e| e.to_string()).collect(),
                execution_plan: Vec::new(),
            };
        }

        let mut table = input.unwrap_or_default();
        let mut logs = vec!["Program validation passed".to_string()];
        let mut errors = Vec::new();
        let mut plan = Vec::new();

        // Validation guarantees a list of objects with string kinds.
        let tasks: Vec<Task> = program
            .get("pipeline")
            .and_then(Value::as_array)
            .map(|steps| steps.iter().filter_map(Task::from_value).collect())
            .unwrap_or_default();
        let total = tasks.len();

        transition(&mut state, RunState::Running);
        tracing::info!(tasks = total, rows = table.row_count(), "run started");

        for (index, task) in tasks.into_iter().enumerate() {
            logs.push(format!("Executing task {}/{}: {}", index + 1, total, task.kind));
            tracing::info!(step = index + 1, kind = %task.kind, "executing task");

            let Some(handler) = self.registry.get(&task.kind) else {
                let msg = format!("No handler registered for task type: {}", task.kind);
                tracing::warn!(kind = %task.kind, "no handler registered");
                logs.push(format!("ERROR: {}", msg));
                errors.push(msg);
                break;
            };

            match handler.run(&table, &task) {
                Ok(next) => {
                    tracing::debug!(kind = %task.kind, rows = next.row_count(), "task completed");
                    table = next;
                    logs.push(format!("Task {} completed successfully", task.kind));
                    plan.push(StepRecord {
                        index,
                        kind: task.kind,
                        config: task.config,
                        success: true,
                        error: None,
                    });
                }
                Err(fault) => {
                    let msg = format!("Task {} failed: {}", task.kind, fault);
                    tracing::warn!(kind = %task.kind, error = %fault, "task failed");
                    logs.push(format!("ERROR: {}", msg));
                    errors.push(msg);
                    plan.push(StepRecord {
                        index,
                        kind: task.kind,
                        config: task.config,
                        success: false,
                        error: Some(fault.message),
                    });
                    break;
                }
            }
        }

        let result = ExecutionResult {
            data: Some(table),
            logs,
            errors,
            execution_plan: plan,
        };
        transition(&mut state, result.state());
        tracing::info!(
            state = %state,
            steps = result.execution_plan.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "run finished"
        );
        result
    }
}

fn transition(state: &mut RunState, next: RunState) {
    tracing::debug!(from = %state, to = %next, "run state");
    *state = next;
}
