//! # Provider
//!
//! The host boundary and the lifecycle shells behind it.
//!
//! Each managed resource kind implements [`ResourceLifecycle`] over a typed
//! state struct; each data source implements [`DataSource`]. The
//! [`registry::Provider`] erases those types so the host can address them by
//! type name with untyped JSON.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::engine::context::OperationContext;
use crate::engine::error::{ProviderError, ProviderResult};

pub mod bandwidth_cluster;
pub mod changes;
pub mod data_source;
pub mod diagnostics;
pub mod dns_record;
pub mod key_pair;
pub mod load_balancer;
pub mod registry;

pub use changes::ChangeSet;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use registry::{HostResponse, Provider};

/// Create, read, update, delete and import for one resource kind
///
/// `read`, `update` and `import` return `None` when the remote resource no
/// longer exists, which clears it from the host state.
#[async_trait]
pub trait ResourceLifecycle: Send + Sync {
    type State: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Type name the host addresses this resource by
    const TYPE_NAME: &'static str;

    /// Identity bound into `state`, if any
    fn id(state: &Self::State) -> Option<&str>;

    /// Create the remote resource
    ///
    /// The identity is bound into `state` as soon as the remote mints it, so
    /// the host keeps track of the resource even if a later step fails.
    async fn create(
        &self,
        ctx: &OperationContext,
        state: &mut Self::State,
        diags: &mut Diagnostics,
    ) -> ProviderResult<()>;

    async fn read(
        &self,
        ctx: &OperationContext,
        current: &Self::State,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>>;

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &Self::State,
        planned: &Self::State,
        changes: &ChangeSet,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>>;

    /// Delete the remote resource; deleting an absent resource succeeds
    async fn delete(
        &self,
        ctx: &OperationContext,
        current: &Self::State,
        diags: &mut Diagnostics,
    ) -> ProviderResult<()>;

    /// Bind local state to an existing remote resource
    async fn import(
        &self,
        ctx: &OperationContext,
        id: &str,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>>;
}

/// Result of a data source query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceResult<T> {
    /// Digest over the ids of the returned entities
    pub id: String,
    pub items: Vec<T>,
}

/// A read-only query against the remote
#[async_trait]
pub trait DataSource: Send + Sync {
    type Query: DeserializeOwned + Send + Sync;
    type Item: Serialize + Send + Sync;

    const TYPE_NAME: &'static str;

    async fn read(
        &self,
        ctx: &OperationContext,
        query: &Self::Query,
        diags: &mut Diagnostics,
    ) -> ProviderResult<DataSourceResult<Self::Item>>;
}

/// Reject changes to attributes that can only be set at creation
pub(crate) fn reject_force_new(changes: &ChangeSet, force_new: &[&str]) -> ProviderResult<()> {
    let forced = changes.intersect(force_new);
    if forced.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::InvalidState(format!(
            "{} cannot be changed in place; the resource must be replaced",
            forced.join(", ")
        )))
    }
}

/// Identity of a resource that must already exist
pub(crate) fn require_id<'a>(id: Option<&'a str>, kind: &str) -> ProviderResult<&'a str> {
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::InvalidState(format!("{kind} id is not set")))
}
