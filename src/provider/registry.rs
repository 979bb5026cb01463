//! # Registry
//!
//! Type-erased dispatch from host calls to lifecycle shells.
//!
//! The adapters here are the projection layer between the host's untyped JSON
//! and the typed state structs: they decode the incoming state, compute the
//! change set for updates, run the shell inside a tracing span and encode the
//! result into a [`HostResponse`]. Errors never escape as `Err`; they become
//! `Error` diagnostics.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info_span, warn, Instrument};

use super::bandwidth_cluster::BandwidthCluster;
use super::changes::ChangeSet;
use super::data_source::{key_pairs::KeyPairsDataSource, load_balancers::LoadBalancersDataSource};
use super::diagnostics::{Diagnostic, Diagnostics};
use super::dns_record::DnsRecord;
use super::key_pair::KeyPair;
use super::load_balancer::{backend::Backend, instance::LoadBalancerInstance, listener::Listener};
use super::{DataSource, ResourceLifecycle};
use crate::client::VendorClient;
use crate::engine::context::{Operation, OperationContext};
use crate::engine::error::{ProviderError, ProviderResult};
use crate::observability::metrics;

/// What the host receives for every call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostResponse {
    /// New state; `None` clears the resource from the host state
    pub state: Option<Value>,
    pub diagnostics: Vec<Diagnostic>,
}

impl HostResponse {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == super::Severity::Error)
    }
}

/// A resource shell addressed with untyped state
#[async_trait]
pub trait DynResource: Send + Sync {
    fn type_name(&self) -> &'static str;
    async fn create(&self, ctx: &OperationContext, planned: Value) -> HostResponse;
    async fn read(&self, ctx: &OperationContext, current: Value) -> HostResponse;
    async fn update(&self, ctx: &OperationContext, prior: Value, planned: Value) -> HostResponse;
    async fn delete(&self, ctx: &OperationContext, current: Value) -> HostResponse;
    async fn import(&self, ctx: &OperationContext, id: &str) -> HostResponse;
}

/// A data source addressed with an untyped query
#[async_trait]
pub trait DynDataSource: Send + Sync {
    fn type_name(&self) -> &'static str;
    async fn read(&self, ctx: &OperationContext, query: Value) -> HostResponse;
}

struct ResourceAdapter<R>(R);

struct DataSourceAdapter<D>(D);

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> ProviderResult<T> {
    Ok(serde_json::from_value(value)?)
}

fn encode<T: Serialize>(state: &T) -> ProviderResult<Value> {
    Ok(serde_json::to_value(state)?)
}

/// Finish a host call: count it, turn a failure into a diagnostic
fn respond(
    type_name: &str,
    operation: &str,
    result: ProviderResult<Option<Value>>,
    fallback_state: Option<Value>,
    mut diags: Diagnostics,
) -> HostResponse {
    metrics::record_operation(type_name, operation);
    let state = match result {
        Ok(state) => state,
        Err(err) => {
            metrics::increment_operation_errors(type_name, operation);
            warn!(code = err.code(), "{} {} failed: {}", type_name, operation, err);
            diags.push_error(format!("failed to {operation} {type_name}"), &err);
            fallback_state
        }
    };
    HostResponse {
        state,
        diagnostics: diags.into_vec(),
    }
}

/// Warn the host that a resource disappeared
fn absent_warning(diags: &mut Diagnostics, type_name: &str, id: Option<&str>) {
    diags.warning(
        format!("{type_name} no longer exists"),
        Some(format!(
            "resource `{}` was not found and will be removed from state",
            id.unwrap_or("<unknown>")
        )),
    );
}

#[async_trait]
impl<R> DynResource for ResourceAdapter<R>
where
    R: ResourceLifecycle + 'static,
{
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    async fn create(&self, ctx: &OperationContext, planned: Value) -> HostResponse {
        let span = info_span!("provider.create", resource.type = R::TYPE_NAME);
        let mut diags = Diagnostics::new();
        let mut bound: Option<Value> = None;
        let result = async {
            let mut state: R::State = decode(planned)?;
            let created = self.0.create(ctx, &mut state, &mut diags).await;
            if R::id(&state).is_some() {
                bound = Some(encode(&state)?);
            }
            created?;
            Ok(Some(encode(&state)?))
        }
        .instrument(span)
        .await;
        respond(R::TYPE_NAME, Operation::Create.as_str(), result, bound, diags)
    }

    async fn read(&self, ctx: &OperationContext, current: Value) -> HostResponse {
        let span = info_span!("provider.read", resource.type = R::TYPE_NAME);
        let mut diags = Diagnostics::new();
        let fallback = Some(current.clone());
        let result = async {
            let state: R::State = decode(current)?;
            match self.0.read(ctx, &state, &mut diags).await? {
                Some(fresh) => Ok(Some(encode(&fresh)?)),
                None => {
                    absent_warning(&mut diags, R::TYPE_NAME, R::id(&state));
                    Ok(None)
                }
            }
        }
        .instrument(span)
        .await;
        respond(R::TYPE_NAME, Operation::Read.as_str(), result, fallback, diags)
    }

    async fn update(&self, ctx: &OperationContext, prior: Value, planned: Value) -> HostResponse {
        let span = info_span!("provider.update", resource.type = R::TYPE_NAME);
        let mut diags = Diagnostics::new();
        let fallback = Some(prior.clone());
        let changes = ChangeSet::between(&prior, &planned);
        let result = async {
            let prior: R::State = decode(prior)?;
            let planned: R::State = decode(planned)?;
            match self
                .0
                .update(ctx, &prior, &planned, &changes, &mut diags)
                .await?
            {
                Some(fresh) => Ok(Some(encode(&fresh)?)),
                None => {
                    absent_warning(&mut diags, R::TYPE_NAME, R::id(&prior));
                    Ok(None)
                }
            }
        }
        .instrument(span)
        .await;
        respond(R::TYPE_NAME, Operation::Update.as_str(), result, fallback, diags)
    }

    async fn delete(&self, ctx: &OperationContext, current: Value) -> HostResponse {
        let span = info_span!("provider.delete", resource.type = R::TYPE_NAME);
        let mut diags = Diagnostics::new();
        let fallback = Some(current.clone());
        let result = async {
            let state: R::State = decode(current)?;
            self.0.delete(ctx, &state, &mut diags).await?;
            Ok(None)
        }
        .instrument(span)
        .await;
        respond(R::TYPE_NAME, Operation::Delete.as_str(), result, fallback, diags)
    }

    async fn import(&self, ctx: &OperationContext, id: &str) -> HostResponse {
        let span = info_span!("provider.import", resource.type = R::TYPE_NAME, resource.id = id);
        let mut diags = Diagnostics::new();
        let result = async {
            match self.0.import(ctx, id, &mut diags).await? {
                Some(state) => Ok(Some(encode(&state)?)),
                None => Err(ProviderError::vendor(
                    crate::engine::error::ErrorCode::ResourceNotFound,
                    format!("cannot import non-existent remote object `{id}`"),
                )),
            }
        }
        .instrument(span)
        .await;
        respond(R::TYPE_NAME, "import", result, None, diags)
    }
}

#[async_trait]
impl<D> DynDataSource for DataSourceAdapter<D>
where
    D: DataSource + 'static,
{
    fn type_name(&self) -> &'static str {
        D::TYPE_NAME
    }

    async fn read(&self, ctx: &OperationContext, query: Value) -> HostResponse {
        let span = info_span!("provider.query", data_source.type = D::TYPE_NAME);
        let mut diags = Diagnostics::new();
        let result = async {
            let query: D::Query = decode(query)?;
            let result = self.0.read(ctx, &query, &mut diags).await?;
            Ok(Some(encode(&result)?))
        }
        .instrument(span)
        .await;
        respond(D::TYPE_NAME, Operation::Read.as_str(), result, None, diags)
    }
}

/// Every resource and data source, by type name
#[derive(Default)]
pub struct Provider {
    resources: BTreeMap<&'static str, Box<dyn DynResource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DynDataSource>>,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Provider {
    /// Register every shell against one vendor client
    #[must_use]
    pub fn new(client: &VendorClient) -> Self {
        let mut provider = Self::default();
        provider.register_resource(LoadBalancerInstance::new(Arc::clone(&client.slb)));
        provider.register_resource(Listener::new(Arc::clone(&client.slb)));
        provider.register_resource(Backend::new(Arc::clone(&client.slb)));
        provider.register_resource(KeyPair::new(Arc::clone(&client.key_pair)));
        provider.register_resource(DnsRecord::new(Arc::clone(&client.private_dns)));
        provider.register_resource(BandwidthCluster::new(Arc::clone(&client.traffic)));
        provider.register_data_source(LoadBalancersDataSource::new(Arc::clone(&client.slb)));
        provider.register_data_source(KeyPairsDataSource::new(Arc::clone(&client.key_pair)));
        provider
    }

    pub fn register_resource<R: ResourceLifecycle + 'static>(&mut self, resource: R) {
        self.resources
            .insert(R::TYPE_NAME, Box::new(ResourceAdapter(resource)));
    }

    pub fn register_data_source<D: DataSource + 'static>(&mut self, data_source: D) {
        self.data_sources
            .insert(D::TYPE_NAME, Box::new(DataSourceAdapter(data_source)));
    }

    #[must_use]
    pub fn resource(&self, type_name: &str) -> Option<&dyn DynResource> {
        self.resources.get(type_name).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn data_source(&self, type_name: &str) -> Option<&dyn DynDataSource> {
        self.data_sources.get(type_name).map(AsRef::as_ref)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Widget {
        #[serde(default)]
        id: Option<String>,
        name: String,
    }

    /// Mints an id, then fails the create
    #[derive(Debug)]
    struct HalfCreated;

    #[async_trait]
    impl ResourceLifecycle for HalfCreated {
        type State = Widget;

        const TYPE_NAME: &'static str = "test_widget";

        fn id(state: &Widget) -> Option<&str> {
            state.id.as_deref()
        }

        async fn create(
            &self,
            _ctx: &OperationContext,
            state: &mut Widget,
            _diags: &mut Diagnostics,
        ) -> ProviderResult<()> {
            state.id = Some("w-1".to_string());
            Err(ProviderError::Pending("widget never became ready".to_string()))
        }

        async fn read(
            &self,
            _ctx: &OperationContext,
            _current: &Widget,
            _diags: &mut Diagnostics,
        ) -> ProviderResult<Option<Widget>> {
            Ok(None)
        }

        async fn update(
            &self,
            _ctx: &OperationContext,
            _prior: &Widget,
            planned: &Widget,
            _changes: &ChangeSet,
            _diags: &mut Diagnostics,
        ) -> ProviderResult<Option<Widget>> {
            Ok(Some(planned.clone()))
        }

        async fn delete(
            &self,
            _ctx: &OperationContext,
            _current: &Widget,
            _diags: &mut Diagnostics,
        ) -> ProviderResult<()> {
            Ok(())
        }

        async fn import(
            &self,
            _ctx: &OperationContext,
            _id: &str,
            _diags: &mut Diagnostics,
        ) -> ProviderResult<Option<Widget>> {
            Ok(None)
        }
    }

    fn provider() -> Provider {
        let mut provider = Provider::default();
        provider.register_resource(HalfCreated);
        provider
    }

    #[tokio::test]
    async fn test_failed_create_keeps_bound_id() {
        let provider = provider();
        let response = provider
            .resource("test_widget")
            .unwrap()
            .create(&OperationContext::default(), json!({ "name": "a" }))
            .await;

        assert!(response.has_errors());
        assert_eq!(response.state.unwrap()["id"], "w-1");
        assert_eq!(
            response.diagnostics[0].code.as_deref(),
            Some("PRECONDITION_PENDING")
        );
    }

    #[tokio::test]
    async fn test_import_of_absent_resource_is_an_error() {
        let provider = provider();
        let response = provider
            .resource("test_widget")
            .unwrap()
            .import(&OperationContext::default(), "w-404")
            .await;

        assert!(response.state.is_none());
        assert_eq!(
            response.diagnostics[0].code.as_deref(),
            Some("RESOURCE_NOT_FOUND")
        );
    }

    #[tokio::test]
    async fn test_read_of_absent_resource_warns() {
        let provider = provider();
        let response = provider
            .resource("test_widget")
            .unwrap()
            .read(&OperationContext::default(), json!({ "id": "w-1", "name": "a" }))
            .await;

        assert!(response.state.is_none());
        assert!(!response.has_errors());
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_state_is_reported() {
        let provider = provider();
        let response = provider
            .resource("test_widget")
            .unwrap()
            .create(&OperationContext::default(), json!({ "id": 7 }))
            .await;

        assert_eq!(response.diagnostics[0].code.as_deref(), Some("SERIALIZATION"));
        assert!(response.state.is_none());
    }

    #[test]
    fn test_type_listing() {
        let provider = provider();
        assert_eq!(provider.resource_types().collect::<Vec<_>>(), vec!["test_widget"]);
        assert!(provider.data_source("test_widget").is_none());
    }
}
