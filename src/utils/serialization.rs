// JSON helpers for outgoing packages and terminal output
// Incoming packages are decoded as a stream by the server
use crate::error::{LedgerError, Result};
use serde::Serialize;

/// Serialize data to compact JSON bytes
pub fn serialize<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(data)
        .map_err(|e| LedgerError::Serialization(format!("Serialization failed: {e}")))
}

/// Pretty JSON for terminal output
pub fn to_pretty_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data)
        .map_err(|e| LedgerError::Serialization(format!("Serialization failed: {e}")))
}
