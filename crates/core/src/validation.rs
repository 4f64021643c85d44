//! Input validation utilities.
//!
//! This module contains functions for validating user inputs to ensure they meet
//! safety and correctness requirements before being used in operations.

use crate::{PortalError, PortalResult};
use chrono::NaiveDate;

/// Validates that a namespace string is safe for embedding in a URI.
///
/// The namespace is recorded on every audit entry and may be embedded into external
/// references of the form `careport://{namespace}/...`:
/// - Rejects empty or whitespace-only strings
/// - Bounds the length to avoid pathological inputs
/// - Restricts characters to a conservative ASCII set suitable for a URI authority
///
/// # Arguments
///
/// * `namespace` - The namespace string to validate.
///
/// # Errors
///
/// Returns a `PortalError::InvalidInput` if the namespace is invalid.
pub fn validate_namespace_safe_for_uri(namespace: &str) -> PortalResult<()> {
    const MAX_NAMESPACE_LEN: usize = 253;

    if namespace.trim().is_empty() {
        return Err(PortalError::InvalidInput("namespace cannot be empty".into()));
    }

    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(PortalError::InvalidInput(format!(
            "namespace exceeds maximum length of {} characters",
            MAX_NAMESPACE_LEN
        )));
    }

    if !namespace.is_ascii() {
        return Err(PortalError::InvalidInput(
            "namespace must contain only ASCII characters".into(),
        ));
    }

    let ok = namespace
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(PortalError::InvalidInput(
            "namespace contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    Ok(())
}

/// Parses a calendar date in `YYYY-MM-DD` form.
///
/// # Errors
///
/// Returns `PortalError::InvalidInput` naming the field if the value does not parse.
pub fn parse_iso_date(field: &str, value: &str) -> PortalResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        PortalError::InvalidInput(format!("{field} must be a YYYY-MM-DD date, got '{value}'"))
    })
}

/// Validates that a quantity is strictly positive.
///
/// # Errors
///
/// Returns `PortalError::InvalidInput` naming the field if the quantity is zero.
pub fn validate_positive_quantity(field: &str, quantity: u32) -> PortalResult<()> {
    if quantity == 0 {
        return Err(PortalError::InvalidInput(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}
