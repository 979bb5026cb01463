//! # Backend Servers
//!
//! Manages the whole set of backend servers attached to one listener. The
//! resource is identified by its listener (`loadBalancerId:listenerId`).
//!
//! A backend is keyed by `(instance_id, private_ip_address, port)`; only the
//! weight can change in place. Updates are dispatched as deregister, then
//! register, then weight modification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

use crate::client::slb::{BackendServer, BackendServersRequest, DescribeBackendsRequest, LISTENER_NOT_FOUND};
use crate::client::SlbApi;
use crate::engine::classify::ErrorPolicy;
use crate::engine::context::{Deadline, Operation, OperationContext};
use crate::engine::error::{ErrorCode, ProviderResult};
use crate::engine::id::{format_id, parse_pair};
use crate::engine::retry::retry_call;
use crate::engine::setdiff::diff_sets;
use crate::provider::{reject_force_new, require_id, ChangeSet, Diagnostics, ResourceLifecycle};

const FORCE_NEW: [&str; 2] = ["load_balancer_id", "listener_id"];

fn default_weight() -> u32 {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BackendAttachment {
    pub instance_id: String,
    pub private_ip_address: String,
    pub port: u32,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl BackendAttachment {
    fn key(&self) -> (String, String, u32) {
        (
            self.instance_id.clone(),
            self.private_ip_address.clone(),
            self.port,
        )
    }
}

impl From<BackendServer> for BackendAttachment {
    fn from(server: BackendServer) -> Self {
        Self {
            instance_id: server.instance_id,
            private_ip_address: server.private_ip_address,
            port: server.port,
            weight: server.weight,
        }
    }
}

impl From<BackendAttachment> for BackendServer {
    fn from(backend: BackendAttachment) -> Self {
        Self {
            instance_id: backend.instance_id,
            private_ip_address: backend.private_ip_address,
            port: backend.port,
            weight: backend.weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendState {
    #[serde(default)]
    pub id: Option<String>,
    pub load_balancer_id: String,
    pub listener_id: String,
    #[serde(default)]
    pub backends: Vec<BackendAttachment>,
}

impl BackendState {
    /// Same attributes with the identity bound and backends in key order
    fn normalized(&self) -> Self {
        let mut backends = self.backends.clone();
        backends.sort();
        Self {
            id: Some(format_id(&[&self.load_balancer_id, &self.listener_id])),
            backends,
            ..self.clone()
        }
    }
}

/// `zenlayercloud_zlb_backend`
pub struct Backend {
    api: Arc<dyn SlbApi>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}

/// Which backend call to make
#[derive(Debug, Clone, Copy)]
enum Dispatch {
    Register,
    Deregister,
    ModifyWeight,
}

impl Backend {
    #[must_use]
    pub fn new(api: Arc<dyn SlbApi>) -> Self {
        Self { api }
    }

    async fn dispatch(
        &self,
        ctx: &OperationContext,
        deadline: Deadline,
        call: Dispatch,
        state: &BackendState,
        backends: Vec<BackendAttachment>,
    ) -> ProviderResult<()> {
        if backends.is_empty() {
            return Ok(());
        }
        let request = BackendServersRequest {
            load_balancer_id: state.load_balancer_id.clone(),
            listener_id: state.listener_id.clone(),
            backend_servers: backends.into_iter().map(BackendServer::from).collect(),
        };
        debug!(?call, count = request.backend_servers.len(), "dispatching backends");

        let policy = match call {
            Dispatch::Deregister => ErrorPolicy::for_delete().ignore(LISTENER_NOT_FOUND),
            Dispatch::Register | Dispatch::ModifyWeight => ErrorPolicy::new(),
        };
        retry_call(ctx, deadline.remaining(), &policy, || match call {
            Dispatch::Register => self.api.register_backend(&request),
            Dispatch::Deregister => self.api.deregister_backend(&request),
            Dispatch::ModifyWeight => self.api.modify_backends_weight(&request),
        })
        .await
        .map_err(|err| {
            err.context(format!(
                "failed to {} backends of listener `{}`",
                match call {
                    Dispatch::Register => "register",
                    Dispatch::Deregister => "deregister",
                    Dispatch::ModifyWeight => "modify weight of",
                },
                state.listener_id
            ))
        })?;
        Ok(())
    }

    async fn read_by_id(&self, ctx: &OperationContext, id: &str) -> ProviderResult<Option<BackendState>> {
        let (load_balancer_id, listener_id) = parse_pair(id)?;
        let request = DescribeBackendsRequest {
            load_balancer_id: load_balancer_id.clone(),
            listener_id: listener_id.clone(),
        };
        let policy = ErrorPolicy::new()
            .ignore(LISTENER_NOT_FOUND)
            .ignore(ErrorCode::ResourceNotFound);
        let response = retry_call(ctx, ctx.budget(Operation::Read), &policy, || {
            self.api.describe_backends(&request)
        })
        .await
        .map_err(|err| err.context(format!("failed to read backends of `{id}`")))?;

        Ok(response.map(|list| {
            BackendState {
                id: None,
                load_balancer_id,
                listener_id,
                backends: list.data_set.into_iter().map(BackendAttachment::from).collect(),
            }
            .normalized()
        }))
    }
}

#[async_trait]
impl ResourceLifecycle for Backend {
    type State = BackendState;

    const TYPE_NAME: &'static str = "zenlayercloud_zlb_backend";

    fn id(state: &Self::State) -> Option<&str> {
        state.id.as_deref()
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        state: &mut Self::State,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        *state = state.normalized();
        let span = info_span!("zlb.backend.create", id = state.id.as_deref());
        let backends = state.backends.clone();
        self.dispatch(ctx, ctx.deadline(Operation::Create), Dispatch::Register, state, backends)
            .instrument(span)
            .await
    }

    async fn read(
        &self,
        ctx: &OperationContext,
        current: &Self::State,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>> {
        let id = require_id(current.id.as_deref(), "backend")?;
        self.read_by_id(ctx, id)
            .instrument(info_span!("zlb.backend.read", id))
            .await
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &Self::State,
        planned: &Self::State,
        changes: &ChangeSet,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>> {
        reject_force_new(changes, &FORCE_NEW)?;
        let planned = planned.normalized();
        let diff = diff_sets(
            &prior.backends,
            &planned.backends,
            BackendAttachment::key,
            |backend: &BackendAttachment| backend.weight,
        );
        if diff.is_empty() {
            return Ok(Some(planned));
        }

        let span = info_span!(
            "zlb.backend.update",
            id = planned.id.as_deref(),
            add = diff.to_add.len(),
            remove = diff.to_remove.len(),
            modify = diff.to_modify.len()
        );
        async {
            let deadline = ctx.deadline(Operation::Update);
            self.dispatch(ctx, deadline, Dispatch::Deregister, &planned, diff.to_remove)
                .await?;
            self.dispatch(ctx, deadline, Dispatch::Register, &planned, diff.to_add)
                .await?;
            let reweighted = diff.to_modify.into_iter().map(|m| m.new).collect();
            self.dispatch(ctx, deadline, Dispatch::ModifyWeight, &planned, reweighted)
                .await?;
            Ok(Some(planned.clone()))
        }
        .instrument(span)
        .await
    }

    async fn delete(
        &self,
        ctx: &OperationContext,
        current: &Self::State,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let span = info_span!("zlb.backend.delete", id = current.id.as_deref());
        self.dispatch(
            ctx,
            ctx.deadline(Operation::Delete),
            Dispatch::Deregister,
            current,
            current.backends.clone(),
        )
        .instrument(span)
        .await
    }

    async fn import(
        &self,
        ctx: &OperationContext,
        id: &str,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>> {
        self.read_by_id(ctx, id)
            .instrument(info_span!("zlb.backend.import", id))
            .await
    }
}
