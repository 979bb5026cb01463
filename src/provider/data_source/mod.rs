//! # Data Sources
//!
//! Read-only list queries. Every data source pages through the remote with
//! the [`Paginator`], filters locally and identifies its result with
//! [`result_digest`].
//!
//! [`Paginator`]: crate::engine::paginate::Paginator
//! [`result_digest`]: crate::engine::digest::result_digest

pub mod key_pairs;
pub mod load_balancers;

pub use key_pairs::KeyPairsDataSource;
pub use load_balancers::LoadBalancersDataSource;

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::engine::error::{ProviderError, ProviderResult};

/// Compile the optional `name_regex` filter
pub(crate) fn compile_name_regex(pattern: Option<&str>) -> ProviderResult<Option<Regex>> {
    pattern
        .map(|pattern| {
            Regex::new(pattern)
                .map_err(|err| ProviderError::Permanent(format!("invalid name_regex `{pattern}`: {err}")))
        })
        .transpose()
}

/// Keep items whose name matches `filter`, or all items without a filter
pub(crate) fn retain_matching<T>(items: &mut Vec<T>, filter: Option<&Regex>, name: impl Fn(&T) -> &str) {
    if let Some(filter) = filter {
        items.retain(|item| filter.is_match(name(item)));
    }
}

/// Write query results as pretty JSON
pub(crate) async fn write_result_file<T: Serialize + Sync>(path: &Path, items: &[T]) -> ProviderResult<()> {
    let json = serde_json::to_string_pretty(items)?;
    tokio::fs::write(path, json).await.map_err(|err| {
        ProviderError::Permanent(format!(
            "failed to write result file `{}`: {err}",
            path.display()
        ))
    })?;
    debug!(path = %path.display(), count = items.len(), "wrote result file");
    Ok(())
}
