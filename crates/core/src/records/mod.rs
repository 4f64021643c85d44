//! On-disk record wire models and translation helpers.
//!
//! Each record kind follows the same shape:
//! - a public domain-level type used by services and APIs
//! - a strict wire struct (`deny_unknown_fields`) that is what actually lands on disk
//! - translation helpers between the two, with `serde_path_to_error` surfacing the
//!   failing field path when a stored document does not match the schema
//!
//! All documents are JSON.

pub mod appointment;
pub mod delivery;
pub mod medicine;
pub mod order;
pub mod patient;
pub mod prescription;

use crate::{PortalError, PortalResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Deserialize a wire document, reporting the failing field path on mismatch.
pub(crate) fn parse_strict<T: DeserializeOwned>(kind: &str, json_text: &str) -> PortalResult<T> {
    let deserializer = &mut serde_json::Deserializer::from_str(json_text);

    match serde_path_to_error::deserialize::<_, T>(deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() { "<root>" } else { path.as_str() };
            Err(PortalError::Translation(format!(
                "{kind} schema mismatch at {path}: {source}"
            )))
        }
    }
}

/// Serialize a wire document as pretty-printed JSON with a trailing newline.
pub(crate) fn render_wire<T: Serialize>(kind: &str, wire: &T) -> PortalResult<String> {
    let mut text = serde_json::to_string_pretty(wire)
        .map_err(|e| PortalError::Translation(format!("Failed to serialise {kind}: {e}")))?;
    text.push('\n');
    Ok(text)
}
