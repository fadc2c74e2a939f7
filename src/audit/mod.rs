//! Run audit trail: append-only JSONL events and program fingerprints.

pub mod eventlog;
pub mod hasher;
