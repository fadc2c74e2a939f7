//! Core interpreter logic.

pub mod config;
pub mod executor;
pub mod explainer;
pub mod registry;
pub mod resolver;
pub mod table;
pub mod types;
pub mod validator;
