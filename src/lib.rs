//! AION: AI-Oriented Notation.
//!
//! Declarative JSON pipelines over tabular data: validate a program, run its
//! tasks in order with fail-fast semantics, and keep a per-step audit trail.

pub mod audit;
pub mod cli;
pub mod core;
pub mod io;
pub mod provider;
pub mod tasks;
