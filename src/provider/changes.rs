//! # Change Sets
//!
//! The set of top-level attributes whose planned value differs from the prior
//! state. Update paths use it to decide which vendor calls to make.

use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed: BTreeSet<String>,
}

impl ChangeSet {
    /// Attributes that differ between two object states
    ///
    /// A missing attribute compares equal to `null`.
    #[must_use]
    pub fn between(prior: &Value, planned: &Value) -> Self {
        let empty = serde_json::Map::new();
        let prior = prior.as_object().unwrap_or(&empty);
        let planned = planned.as_object().unwrap_or(&empty);

        let changed = prior
            .keys()
            .chain(planned.keys())
            .filter(|key| {
                prior.get(*key).unwrap_or(&Value::Null) != planned.get(*key).unwrap_or(&Value::Null)
            })
            .cloned()
            .collect();
        Self { changed }
    }

    #[must_use]
    pub fn has(&self, attribute: &str) -> bool {
        self.changed.contains(attribute)
    }

    /// True if any of `attributes` changed
    #[must_use]
    pub fn has_any(&self, attributes: &[&str]) -> bool {
        attributes.iter().any(|attribute| self.has(attribute))
    }

    /// Changed attributes among `attributes`, in the given order
    #[must_use]
    pub fn intersect<'a>(&self, attributes: &[&'a str]) -> Vec<&'a str> {
        attributes
            .iter()
            .copied()
            .filter(|attribute| self.has(attribute))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            changed: iter.into_iter().map(Into::into).collect(),
        }
    }
}
