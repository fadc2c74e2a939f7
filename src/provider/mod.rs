//! Model providers: the boundary behind the `model_call` task.
//!
//! A provider maps `(prompt, input)` to output text. Failures are rendered
//! into the output as `[Error: ...]` rather than raised.

pub mod command;

use crate::core::config::AionConfig;
use command::CommandProvider;
use indexmap::IndexMap;
use std::sync::Arc;

/// Name of the built-in provider.
pub const SIMULATE: &str = "simulate";

/// Something that can answer a prompt.
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Complete `prompt` for one input value (`None` when the task has no input column).
    fn complete(&self, prompt: &str, input: Option<&str>) -> String;
}

/// Deterministic in-process echo.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulateProvider;

impl ModelProvider for SimulateProvider {
    fn name(&self) -> &str {
        SIMULATE
    }

    fn complete(&self, prompt: &str, input: Option<&str>) -> String {
        match input {
            Some(text) => format!("[AI: {}] {}", prompt, text),
            None => format!("[AI: {}]", prompt),
        }
    }
}

/// Provider name → provider. Always contains `simulate`.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: IndexMap<String, Arc<dyn ModelProvider>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let mut providers: IndexMap<String, Arc<dyn ModelProvider>> = IndexMap::new();
        providers.insert(SIMULATE.to_string(), Arc::new(SimulateProvider));
        Self { providers }
    }

    /// Registry with `simulate` plus every command provider declared in `config`.
    pub fn from_config(config: &AionConfig) -> Self {
        let mut reg = Self::new();
        for (name, provider) in &config.providers {
            if name == SIMULATE {
                tracing::warn!("ignoring configured provider that shadows 'simulate'");
                continue;
            }
            reg.register(Arc::new(CommandProvider::new(
                name,
                &provider.command,
                &provider.args,
            )));
        }
        reg
    }

    /// Add or replace a provider under its own name.
    pub fn register(&mut self, provider: Arc<dyn ModelProvider>) {
        let name = provider.name().to_string();
        tracing::debug!(provider = %name, "registered model provider");
        self.providers.insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.providers.keys()).finish()
    }
}
