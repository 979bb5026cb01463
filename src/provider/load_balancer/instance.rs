//! # Load Balancer Instance
//!
//! Status transitions driven by this shell:
//!
//! ```text
//! create:  ∅ → CREATING → AVAILABLE | CREATE_FAILED
//! delete:  AVAILABLE → RELEASING → RECYCLE | absent
//! ```
//!
//! Reads retry while the instance is `CREATING` or `RELEASING` and surface
//! `CREATE_FAILED` as a terminal error. An instance in `RECYCLE` counts as
//! gone.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, field, info, info_span, Instrument, Span};

use crate::client::slb::{
    CreateLoadBalancerRequest, DescribeLoadBalancersRequest, LoadBalancerInfo,
    LoadBalancerStatus, ModifyLoadBalancerResourceGroupRequest,
    ModifyLoadBalancerSecurityGroupRequest, ModifyLoadBalancersAttributeRequest,
    TerminateLoadBalancerRequest,
};
use crate::client::SlbApi;
use crate::engine::classify::ErrorPolicy;
use crate::engine::context::{Operation, OperationContext};
use crate::engine::error::{ProviderError, ProviderResult};
use crate::engine::retry::retry_call;
use crate::engine::waiter::{Observed, StatusWaiter, WaitOutcome};
use crate::provider::{reject_force_new, require_id, ChangeSet, Diagnostics, ResourceLifecycle};

/// Attributes that require a replacement
const FORCE_NEW: [&str; 2] = ["region_id", "vpc_id"];

/// Attributes updated in place, one vendor call each, in this order
const UPDATABLE: [&str; 3] = ["name", "security_group_id", "resource_group_id"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerState {
    #[serde(default)]
    pub id: Option<String>,
    pub region_id: String,
    pub vpc_id: String,
    pub name: String,
    #[serde(default)]
    pub security_group_id: Option<String>,
    #[serde(default)]
    pub resource_group_id: Option<String>,

    // Computed
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub private_ip_addresses: Vec<String>,
    #[serde(default)]
    pub public_ip_addresses: Vec<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

impl LoadBalancerState {
    pub(crate) fn from_info(info: LoadBalancerInfo) -> Self {
        Self {
            id: Some(info.load_balancer_id),
            region_id: info.region_id,
            vpc_id: info.vpc_id,
            name: info.load_balancer_name,
            security_group_id: info.security_group_id,
            resource_group_id: info.resource_group_id,
            status: Some(info.status.to_string()),
            private_ip_addresses: info.private_ip_address,
            public_ip_addresses: info.public_ip_address,
            create_time: info.create_time,
        }
    }

    /// Planned attributes with the identity and computed values of `prior`
    fn carry_computed(planned: &Self, prior: &Self) -> Self {
        Self {
            id: prior.id.clone(),
            status: prior.status.clone(),
            private_ip_addresses: prior.private_ip_addresses.clone(),
            public_ip_addresses: prior.public_ip_addresses.clone(),
            create_time: prior.create_time.clone(),
            ..planned.clone()
        }
    }
}

/// `zenlayercloud_zlb_instance`
pub struct LoadBalancerInstance {
    api: Arc<dyn SlbApi>,
}

impl std::fmt::Debug for LoadBalancerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancerInstance").finish_non_exhaustive()
    }
}

impl LoadBalancerInstance {
    #[must_use]
    pub fn new(api: Arc<dyn SlbApi>) -> Self {
        Self { api }
    }

    /// Look an instance up by id; `None` when the remote does not list it
    async fn describe(&self, id: &str) -> ProviderResult<Option<LoadBalancerInfo>> {
        let request = DescribeLoadBalancersRequest {
            load_balancer_ids: vec![id.to_string()],
            ..Default::default()
        };
        let response = self.api.describe_load_balancers(&request).await?;
        Ok(response
            .data_set
            .into_iter()
            .find(|lb| lb.load_balancer_id == id))
    }

    async fn observe(&self, id: &str) -> ProviderResult<Observed<LoadBalancerInfo>> {
        Ok(match self.describe(id).await? {
            Some(info) => Observed::Present(info),
            None => Observed::Absent,
        })
    }

    /// Read through any in-flight transition
    async fn read_by_id(
        &self,
        ctx: &OperationContext,
        id: &str,
        timeout: Duration,
    ) -> ProviderResult<Option<LoadBalancerState>> {
        let waiter = StatusWaiter::new()
            .operating([LoadBalancerStatus::Creating, LoadBalancerStatus::Releasing])
            .failure([LoadBalancerStatus::CreateFailed])
            .accept_absent(true);

        let outcome = waiter
            .wait_for(ctx, timeout, || self.observe(id), |lb: &LoadBalancerInfo| lb.status.clone())
            .await;

        match outcome {
            Ok(WaitOutcome::Reached(info)) if info.status == LoadBalancerStatus::Recycle => {
                debug!(load_balancer_id = id, "load balancer is recycled");
                Ok(None)
            }
            Ok(WaitOutcome::Reached(info)) => Ok(Some(LoadBalancerState::from_info(info))),
            Ok(WaitOutcome::Absent) => Ok(None),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.context(format!("failed to read load balancer `{id}`"))),
        }
    }
}

#[async_trait]
impl ResourceLifecycle for LoadBalancerInstance {
    type State = LoadBalancerState;

    const TYPE_NAME: &'static str = "zenlayercloud_zlb_instance";

    fn id(state: &Self::State) -> Option<&str> {
        state.id.as_deref()
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        state: &mut Self::State,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let span = info_span!("zlb.instance.create", load_balancer_id = field::Empty);
        async {
            let deadline = ctx.deadline(Operation::Create);
            let request = CreateLoadBalancerRequest {
                region_id: state.region_id.clone(),
                vpc_id: state.vpc_id.clone(),
                load_balancer_name: state.name.clone(),
                security_group_id: state.security_group_id.clone(),
                resource_group_id: state.resource_group_id.clone(),
            };

            let response = retry_call(ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                self.api.create_load_balancer(&request)
            })
            .await
            .map_err(|err| err.context("failed to create load balancer"))?
            .unwrap_or_default();

            let id = response.load_balancer_ids.into_iter().next().ok_or_else(|| {
                ProviderError::Internal("create returned no load balancer id".to_string())
            })?;
            Span::current().record("load_balancer_id", id.as_str());
            info!(load_balancer_id = %id, "load balancer created, waiting for it to become available");
            state.id = Some(id.clone());

            let waiter = StatusWaiter::new()
                .operating([LoadBalancerStatus::Creating])
                .success([LoadBalancerStatus::Available, LoadBalancerStatus::Running])
                .failure([LoadBalancerStatus::CreateFailed]);

            let outcome = waiter
                .wait_for(ctx, deadline.remaining(), || self.observe(&id), |lb: &LoadBalancerInfo| {
                    lb.status.clone()
                })
                .await;

            match outcome {
                Ok(WaitOutcome::Reached(info)) => {
                    *state = LoadBalancerState::from_info(info);
                    Ok(())
                }
                Ok(WaitOutcome::Absent) => Err(ProviderError::Internal(format!(
                    "load balancer `{id}` disappeared while being created"
                ))),
                Err(ProviderError::TerminalStatus { .. }) => Err(ProviderError::Permanent(
                    format!("load balancer `{id}` created failed"),
                )),
                Err(err) => Err(err.context(format!("failed to create load balancer `{id}`"))),
            }
        }
        .instrument(span)
        .await
    }

    async fn read(
        &self,
        ctx: &OperationContext,
        current: &Self::State,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>> {
        let id = require_id(current.id.as_deref(), "load balancer")?;
        self.read_by_id(ctx, id, ctx.budget(Operation::Read))
            .instrument(info_span!("zlb.instance.read", load_balancer_id = id))
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
        let id = require_id(prior.id.as_deref(), "load balancer")?;
        reject_force_new(changes, &FORCE_NEW)?;
        if !changes.has_any(&UPDATABLE) {
            return Ok(Some(LoadBalancerState::carry_computed(planned, prior)));
        }

        let span = info_span!("zlb.instance.update", load_balancer_id = id);
        async {
            let deadline = ctx.deadline(Operation::Update);
            let policy = ErrorPolicy::new();

            if changes.has("name") {
                let request = ModifyLoadBalancersAttributeRequest {
                    load_balancer_ids: vec![id.to_string()],
                    load_balancer_name: planned.name.clone(),
                };
                retry_call(ctx, deadline.remaining(), &policy, || {
                    self.api.modify_load_balancers_attribute(&request)
                })
                .await
                .map_err(|err| err.context(format!("failed to rename load balancer `{id}`")))?;
            }

            if changes.has("security_group_id") {
                let security_group_id = planned.security_group_id.clone().ok_or_else(|| {
                    ProviderError::InvalidState(
                        "security_group_id cannot be removed from a load balancer".to_string(),
                    )
                })?;
                let request = ModifyLoadBalancerSecurityGroupRequest {
                    load_balancer_id: id.to_string(),
                    security_group_id,
                };
                retry_call(ctx, deadline.remaining(), &policy, || {
                    self.api.modify_load_balancer_security_group(&request)
                })
                .await
                .map_err(|err| {
                    err.context(format!(
                        "failed to modify security group of load balancer `{id}`"
                    ))
                })?;
            }

            if changes.has("resource_group_id") {
                let resource_group_id = planned.resource_group_id.clone().ok_or_else(|| {
                    ProviderError::InvalidState(
                        "resource_group_id cannot be removed from a load balancer".to_string(),
                    )
                })?;
                let request = ModifyLoadBalancerResourceGroupRequest {
                    load_balancer_id: id.to_string(),
                    resource_group_id,
                };
                retry_call(ctx, deadline.remaining(), &policy, || {
                    self.api.modify_load_balancer_resource_group(&request)
                })
                .await
                .map_err(|err| {
                    err.context(format!(
                        "failed to modify resource group of load balancer `{id}`"
                    ))
                })?;
            }

            self.read_by_id(ctx, id, deadline.remaining()).await
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
        let id = require_id(current.id.as_deref(), "load balancer")?;
        let span = info_span!("zlb.instance.delete", load_balancer_id = id);
        async {
            let deadline = ctx.deadline(Operation::Delete);
            let request = TerminateLoadBalancerRequest {
                load_balancer_id: id.to_string(),
            };
            let terminated = retry_call(ctx, deadline.remaining(), &ErrorPolicy::for_delete(), || {
                self.api.terminate_load_balancer(&request)
            })
            .await
            .map_err(|err| err.context(format!("failed to delete load balancer `{id}`")))?;
            if terminated.is_none() {
                debug!("load balancer already gone");
                return Ok(());
            }

            // The status can lag behind the terminate call for a few polls
            let waiter = StatusWaiter::new()
                .operating([
                    LoadBalancerStatus::Releasing,
                    LoadBalancerStatus::Available,
                    LoadBalancerStatus::Running,
                ])
                .success([LoadBalancerStatus::Recycle])
                .accept_absent(true);

            match waiter
                .wait_for(ctx, deadline.remaining(), || self.observe(id), |lb: &LoadBalancerInfo| {
                    lb.status.clone()
                })
                .await
            {
                Ok(_) => Ok(()),
                Err(err) if err.is_not_found() => Ok(()),
                Err(err) => Err(err.context(format!("failed to delete load balancer `{id}`"))),
            }
        }
        .instrument(span)
        .await
    }

    async fn import(
        &self,
        ctx: &OperationContext,
        id: &str,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>> {
        self.read_by_id(ctx, id, ctx.budget(Operation::Read))
            .instrument(info_span!("zlb.instance.import", load_balancer_id = id))
            .await
    }
}
