//! # Composite Identifiers
//!
//! Child resources whose remote id does not embed the parent are stored as
//! `parent:child`. The codec only counts parts; it never inspects them.

use super::error::ProviderError;
use crate::constants::ID_DELIMITER;

/// Join identifier parts with the delimiter
#[must_use]
pub fn format_id(parts: &[&str]) -> String {
    parts.join(&ID_DELIMITER.to_string())
}

/// Split `id` into exactly `arity` parts
///
/// # Errors
/// Returns [`ProviderError::MalformedId`] when the number of parts differs from `arity`.
pub fn parse_id(id: &str, arity: usize) -> Result<Vec<String>, ProviderError> {
    let parts: Vec<String> = id.split(ID_DELIMITER).map(str::to_string).collect();
    if parts.len() != arity {
        return Err(ProviderError::MalformedId {
            id: id.to_string(),
            expected: arity,
            found: parts.len(),
        });
    }
    Ok(parts)
}

/// Split a `parent:child` identifier
///
/// # Errors
/// Returns [`ProviderError::MalformedId`] unless `id` has exactly one delimiter.
pub fn parse_pair(id: &str) -> Result<(String, String), ProviderError> {
    let mut parts = parse_id(id, 2)?.into_iter();
    match (parts.next(), parts.next()) {
        (Some(parent), Some(child)) => Ok((parent, child)),
        _ => Err(ProviderError::MalformedId {
            id: id.to_string(),
            expected: 2,
            found: 0,
        }),
    }
}
