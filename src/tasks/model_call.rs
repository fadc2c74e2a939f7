//! `model_call`: run a model provider over rows.

use super::decode;
use crate::core::registry::TaskHandler;
use crate::core::table::{Scalar, Table};
use crate::core::types::{Fault, ModelCallTask, Task};
use crate::provider::ProviderRegistry;
use std::sync::Arc;

/// Handler bound to the host's provider registry.
#[derive(Debug, Clone)]
pub struct ModelCall {
    providers: Arc<ProviderRegistry>,
}

impl ModelCall {
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self { providers }
    }
}

impl TaskHandler for ModelCall {
    fn run(&self, table: &Table, task: &Task) -> Result<Table, Fault> {
        if table.is_empty() {
            return Ok(table.clone());
        }
        let spec: ModelCallTask = decode(task)?;
        let provider = self
            .providers
            .get(&spec.provider)
            .ok_or_else(|| Fault::new(format!("Unknown model provider: {}", spec.provider)))?;

        let input = spec.input_field.as_deref().and_then(|f| table.column(f));
        let outputs: Vec<Scalar> = match input {
            Some(cells) => cells
                .into_iter()
                .map(|cell| Scalar::Str(provider.complete(&spec.prompt, Some(&cell.to_string()))))
                .collect(),
            None => {
                // No usable input column: one call, broadcast.
                let text = provider.complete(&spec.prompt, None);
                vec![Scalar::Str(text); table.row_count()]
            }
        };
        tracing::debug!(
            provider = %spec.provider,
            output = %spec.output_field,
            rows = outputs.len(),
            "model call finished"
        );
        Ok(table.clone().with_column(&spec.output_field, outputs)?)
    }
}
