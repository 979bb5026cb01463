//! # Listener
//!
//! Listeners are children of a load balancer, identified as
//! `loadBalancerId:listenerId`. A freshly created listener can take a few
//! seconds to show up in `DescribeListeners`; the remote reports
//! `INVALID_LB_LISTENER_NOT_FOUND` meanwhile.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{field, info, info_span, Instrument, Span};

use crate::client::slb::{
    CreateListenerRequest, DeleteListenerRequest, DescribeListenersRequest, ListenerInfo,
    ModifyListenerRequest, LISTENER_NOT_FOUND,
};
use crate::client::SlbApi;
use crate::engine::classify::ErrorPolicy;
use crate::engine::context::{Operation, OperationContext};
use crate::engine::error::{ErrorCode, ProviderError, ProviderResult};
use crate::engine::id::{format_id, parse_pair};
use crate::engine::retry::retry_call;
use crate::provider::{reject_force_new, require_id, ChangeSet, Diagnostics, ResourceLifecycle};

const FORCE_NEW: [&str; 3] = ["load_balancer_id", "protocol", "port"];

/// Attributes sent together in one `ModifyListener` call
const ATTRIBUTES: [&str; 5] = [
    "name",
    "scheduler",
    "health_check_enabled",
    "health_check_type",
    "health_check_port",
];

fn default_scheduler() -> String {
    "mh".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerState {
    #[serde(default)]
    pub id: Option<String>,
    pub load_balancer_id: String,
    pub name: String,
    pub protocol: String,
    pub port: u32,
    #[serde(default = "default_scheduler")]
    pub scheduler: String,
    #[serde(default = "default_true")]
    pub health_check_enabled: bool,
    #[serde(default)]
    pub health_check_type: Option<String>,
    #[serde(default)]
    pub health_check_port: Option<u32>,

    // Computed
    #[serde(default)]
    pub listener_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ListenerState {
    fn from_info(load_balancer_id: &str, info: ListenerInfo) -> Self {
        Self {
            id: Some(format_id(&[load_balancer_id, &info.listener_id])),
            load_balancer_id: load_balancer_id.to_string(),
            name: info.listener_name,
            protocol: info.protocol,
            port: info.port,
            scheduler: info.scheduler,
            health_check_enabled: info.health_check_enabled,
            health_check_type: info.health_check_type,
            health_check_port: info.health_check_port,
            listener_id: Some(info.listener_id),
            status: info.status,
        }
    }
}

/// `zenlayercloud_zlb_listener`
pub struct Listener {
    api: Arc<dyn SlbApi>,
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").finish_non_exhaustive()
    }
}

impl Listener {
    #[must_use]
    pub fn new(api: Arc<dyn SlbApi>) -> Self {
        Self { api }
    }

    async fn describe(
        &self,
        load_balancer_id: &str,
        listener_id: &str,
    ) -> ProviderResult<Option<ListenerInfo>> {
        let request = DescribeListenersRequest {
            load_balancer_id: load_balancer_id.to_string(),
            listener_ids: vec![listener_id.to_string()],
        };
        let response = self.api.describe_listeners(&request).await?;
        Ok(response
            .data_set
            .into_iter()
            .find(|listener| listener.listener_id == listener_id))
    }

    async fn read_by_id(
        &self,
        ctx: &OperationContext,
        id: &str,
        timeout: Duration,
    ) -> ProviderResult<Option<ListenerState>> {
        let (load_balancer_id, listener_id) = parse_pair(id)?;
        let policy = ErrorPolicy::new()
            .ignore(LISTENER_NOT_FOUND)
            .ignore(ErrorCode::ResourceNotFound);
        let found = retry_call(ctx, timeout, &policy, || {
            self.describe(&load_balancer_id, &listener_id)
        })
        .await
        .map_err(|err| err.context(format!("failed to read listener `{id}`")))?
        .flatten();
        Ok(found.map(|info| ListenerState::from_info(&load_balancer_id, info)))
    }
}

#[async_trait]
impl ResourceLifecycle for Listener {
    type State = ListenerState;

    const TYPE_NAME: &'static str = "zenlayercloud_zlb_listener";

    fn id(state: &Self::State) -> Option<&str> {
        state.id.as_deref()
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        state: &mut Self::State,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let span = info_span!(
            "zlb.listener.create",
            load_balancer_id = %state.load_balancer_id,
            listener_id = field::Empty
        );
        async {
            let deadline = ctx.deadline(Operation::Create);
            let load_balancer_id = state.load_balancer_id.clone();
            let request = CreateListenerRequest {
                load_balancer_id: load_balancer_id.clone(),
                listener_name: state.name.clone(),
                protocol: state.protocol.clone(),
                port: state.port,
                scheduler: state.scheduler.clone(),
                health_check_enabled: state.health_check_enabled,
                health_check_type: state.health_check_type.clone(),
                health_check_port: state.health_check_port,
            };

            let listener_id = retry_call(ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                self.api.create_listener(&request)
            })
            .await
            .map_err(|err| {
                err.context(format!(
                    "failed to create listener on load balancer `{load_balancer_id}`"
                ))
            })?
            .map(|response| response.listener_id)
            .filter(|listener_id| !listener_id.is_empty())
            .ok_or_else(|| ProviderError::Internal("create returned no listener id".to_string()))?;

            Span::current().record("listener_id", listener_id.as_str());
            info!(%listener_id, "listener created");
            let id = format_id(&[&load_balancer_id, &listener_id]);
            state.id = Some(id.clone());
            state.listener_id = Some(listener_id.clone());

            let visible = ErrorPolicy::new().retry_on(LISTENER_NOT_FOUND);
            let (lb, lsn) = (load_balancer_id.as_str(), listener_id.as_str());
            let info = retry_call(ctx, deadline.remaining(), &visible, || async move {
                self.describe(lb, lsn)
                    .await?
                    .ok_or_else(|| {
                        ProviderError::Pending(format!("listener `{lsn}` is not visible yet"))
                    })
            })
            .await
            .map_err(|err| err.context(format!("failed to read listener `{id}` after create")))?
            .ok_or_else(|| ProviderError::Internal(format!("listener `{id}` vanished")))?;

            *state = ListenerState::from_info(&load_balancer_id, info);
            Ok(())
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
        let id = require_id(current.id.as_deref(), "listener")?;
        self.read_by_id(ctx, id, ctx.budget(Operation::Read))
            .instrument(info_span!("zlb.listener.read", id))
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
        let id = require_id(prior.id.as_deref(), "listener")?;
        reject_force_new(changes, &FORCE_NEW)?;
        reject_cleared_health_check(prior, planned)?;
        if !changes.has_any(&ATTRIBUTES) {
            return Ok(Some(Self::State {
                id: prior.id.clone(),
                listener_id: prior.listener_id.clone(),
                status: prior.status.clone(),
                ..planned.clone()
            }));
        }

        let span = info_span!("zlb.listener.update", id);
        async {
            let deadline = ctx.deadline(Operation::Update);
            let (load_balancer_id, listener_id) = parse_pair(id)?;
            let request = ModifyListenerRequest {
                load_balancer_id,
                listener_id,
                listener_name: changes.has("name").then(|| planned.name.clone()),
                scheduler: changes.has("scheduler").then(|| planned.scheduler.clone()),
                health_check_enabled: changes
                    .has("health_check_enabled")
                    .then_some(planned.health_check_enabled),
                health_check_type: planned
                    .health_check_type
                    .clone()
                    .filter(|_| changes.has("health_check_type")),
                health_check_port: planned
                    .health_check_port
                    .filter(|_| changes.has("health_check_port")),
            };
            retry_call(ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                self.api.modify_listener(&request)
            })
            .await
            .map_err(|err| err.context(format!("failed to modify listener `{id}`")))?;

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
        let id = require_id(current.id.as_deref(), "listener")?;
        let (load_balancer_id, listener_id) = parse_pair(id)?;
        let request = DeleteListenerRequest {
            load_balancer_id,
            listener_id,
        };
        let policy = ErrorPolicy::for_delete().ignore(LISTENER_NOT_FOUND);
        retry_call(ctx, ctx.budget(Operation::Delete), &policy, || {
            self.api.delete_listener(&request)
        })
        .instrument(info_span!("zlb.listener.delete", id))
        .await
        .map_err(|err| err.context(format!("failed to delete listener `{id}`")))?;
        Ok(())
    }

    async fn import(
        &self,
        ctx: &OperationContext,
        id: &str,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>> {
        self.read_by_id(ctx, id, ctx.budget(Operation::Read))
            .instrument(info_span!("zlb.listener.import", id))
            .await
    }
}

/// `ModifyListener` omits unset fields, so a set health check value cannot be unset in place
fn reject_cleared_health_check(prior: &ListenerState, planned: &ListenerState) -> ProviderResult<()> {
    let mut cleared = Vec::new();
    if prior.health_check_type.is_some() && planned.health_check_type.is_none() {
        cleared.push("health_check_type");
    }
    if prior.health_check_port.is_some() && planned.health_check_port.is_none() {
        cleared.push("health_check_port");
    }
    if cleared.is_empty() {
        return Ok(());
    }
    Err(ProviderError::InvalidState(format!(
        "{} cannot be cleared once set; set a value or replace the listener",
        cleared.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_info_builds_composite_id() {
        let info = ListenerInfo {
            listener_id: "lsn-7".to_string(),
            listener_name: "http".to_string(),
            protocol: "TCP".to_string(),
            port: 80,
            scheduler: "wrr".to_string(),
            health_check_enabled: true,
            health_check_type: Some("TCP".to_string()),
            health_check_port: None,
            status: Some("AVAILABLE".to_string()),
        };
        let state = ListenerState::from_info("zlb-1", info);
        assert_eq!(state.id.as_deref(), Some("zlb-1:lsn-7"));
        assert_eq!(state.listener_id.as_deref(), Some("lsn-7"));
        assert_eq!(state.port, 80);
    }

    #[test]
    fn test_state_defaults() {
        let state: ListenerState = serde_json::from_value(serde_json::json!({
            "load_balancer_id": "zlb-1",
            "name": "http",
            "protocol": "TCP",
            "port": 80,
        }))
        .unwrap();
        assert_eq!(state.scheduler, "mh");
        assert!(state.health_check_enabled);
    }
}
