//! BLAKE3 fingerprints for programs.

use serde_json::Value;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Hash a program by its compact JSON text (key order as written).
pub fn hash_program(program: &Value) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(program.to_string().as_bytes());
    format!("blake3:{}", hasher.finalize().to_hex())
}
