//! # Diagnostics
//!
//! Messages returned to the host alongside state. Errors are never dropped:
//! every failed operation ends up as an `Error` diagnostic carrying its code.

use serde::{Deserialize, Serialize};

use crate::engine::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Stable error code, for error diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Diagnostics collected during one host call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, summary: impl Into<String>, detail: Option<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail,
            code: None,
        });
    }

    pub fn warning(&mut self, summary: impl Into<String>, detail: Option<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail,
            code: None,
        });
    }

    /// Record a failed operation
    pub fn push_error(&mut self, summary: impl Into<String>, err: &ProviderError) {
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: Some(err.to_string()),
            code: Some(err.code().to_string()),
        });
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_error_keeps_code() {
        let mut diags = Diagnostics::new();
        diags.warning("resource no longer exists", None);
        assert!(!diags.has_errors());

        let err = ProviderError::vendor("INVALID_PARAMETER", "bad ttl").context("failed to update record");
        diags.push_error("update failed", &err);
        assert!(diags.has_errors());

        let last = diags.iter().last().unwrap();
        assert_eq!(last.code.as_deref(), Some("INVALID_PARAMETER"));
        assert_eq!(
            serde_json::to_value(last).unwrap()["severity"],
            serde_json::json!("error")
        );
    }
}
