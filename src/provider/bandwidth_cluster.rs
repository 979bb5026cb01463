//! # Bandwidth Cluster
//!
//! A shared bandwidth pool in one area. The remote refuses to delete a
//! cluster while resources are still attached, so delete first waits for the
//! cluster to drain.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, Instrument};

use crate::client::traffic::{
    BandwidthClusterInfo, CreateBandwidthClusterRequest, DeleteBandwidthClusterRequest,
    DescribeBandwidthClusterResourcesRequest, DescribeBandwidthClustersRequest,
    UpdateBandwidthClusterCommitBandwidthRequest, CLUSTER_INSTANCE_ASSOCIATED,
};
use crate::client::TrafficApi;
use crate::engine::classify::ErrorPolicy;
use crate::engine::context::{Operation, OperationContext};
use crate::engine::error::{ErrorCode, ProviderError, ProviderResult};
use crate::engine::retry::retry_call;
use crate::provider::{reject_force_new, require_id, ChangeSet, Diagnostics, ResourceLifecycle};

const FORCE_NEW: [&str; 1] = ["area_code"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthClusterState {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub area_code: String,
    pub commit_bandwidth_mbps: u32,

    // Computed
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

impl BandwidthClusterState {
    fn from_info(info: BandwidthClusterInfo) -> Self {
        Self {
            id: Some(info.bandwidth_cluster_id),
            name: info.bandwidth_cluster_name,
            area_code: info.area_code,
            commit_bandwidth_mbps: info.commit_bandwidth_mbps,
            status: info.status,
            create_time: info.create_time,
        }
    }
}

/// `zenlayercloud_bandwidth_cluster`
pub struct BandwidthCluster {
    api: Arc<dyn TrafficApi>,
}

impl std::fmt::Debug for BandwidthCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandwidthCluster").finish_non_exhaustive()
    }
}

impl BandwidthCluster {
    #[must_use]
    pub fn new(api: Arc<dyn TrafficApi>) -> Self {
        Self { api }
    }

    async fn read_by_id(
        &self,
        ctx: &OperationContext,
        id: &str,
        timeout: Duration,
    ) -> ProviderResult<Option<BandwidthClusterState>> {
        let request = DescribeBandwidthClustersRequest {
            bandwidth_cluster_ids: vec![id.to_string()],
            ..Default::default()
        };
        let policy = ErrorPolicy::new().ignore(ErrorCode::ResourceNotFound);
        let response = retry_call(ctx, timeout, &policy, || {
            self.api.describe_bandwidth_clusters(&request)
        })
        .await
        .map_err(|err| err.context(format!("failed to read bandwidth cluster `{id}`")))?;

        Ok(response
            .and_then(|list| {
                list.data_set
                    .into_iter()
                    .find(|cluster| cluster.bandwidth_cluster_id == id)
            })
            .map(BandwidthClusterState::from_info))
    }

    /// Wait until no resource is attached to the cluster
    ///
    /// Returns `false` if the cluster is already gone.
    async fn wait_until_empty(
        &self,
        ctx: &OperationContext,
        id: &str,
        timeout: Duration,
    ) -> ProviderResult<bool> {
        let request = DescribeBandwidthClusterResourcesRequest {
            bandwidth_cluster_id: id.to_string(),
            ..Default::default()
        };
        let request = &request;
        let drained = retry_call(ctx, timeout, &ErrorPolicy::for_delete(), || async move {
            let resources = self.api.describe_bandwidth_cluster_resources(request).await?;
            if resources.total_count == 0 {
                Ok(())
            } else {
                Err(ProviderError::Pending(format!(
                    "bandwidth cluster `{id}` still has {} resources",
                    resources.total_count
                )))
            }
        })
        .await?;
        Ok(drained.is_some())
    }
}

#[async_trait]
impl ResourceLifecycle for BandwidthCluster {
    type State = BandwidthClusterState;

    const TYPE_NAME: &'static str = "zenlayercloud_bandwidth_cluster";

    fn id(state: &Self::State) -> Option<&str> {
        state.id.as_deref()
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        state: &mut Self::State,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let span = info_span!("traffic.bandwidth_cluster.create", name = %state.name);
        async {
            let deadline = ctx.deadline(Operation::Create);
            let request = CreateBandwidthClusterRequest {
                area_code: state.area_code.clone(),
                bandwidth_cluster_name: state.name.clone(),
                commit_bandwidth_mbps: state.commit_bandwidth_mbps,
            };
            let id = retry_call(ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                self.api.create_bandwidth_cluster(&request)
            })
            .await
            .map_err(|err| err.context("failed to create bandwidth cluster"))?
            .map(|response| response.bandwidth_cluster_id)
            .ok_or_else(|| {
                ProviderError::Internal("create returned no bandwidth cluster id".to_string())
            })?;

            info!(bandwidth_cluster_id = %id, "bandwidth cluster created");
            state.id = Some(id.clone());

            match self.read_by_id(ctx, &id, deadline.remaining()).await? {
                Some(created) => {
                    *state = created;
                    Ok(())
                }
                None => Err(ProviderError::Pending(format!(
                    "bandwidth cluster `{id}` is not visible after create"
                ))),
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
        let id = require_id(current.id.as_deref(), "bandwidth cluster")?;
        self.read_by_id(ctx, id, ctx.budget(Operation::Read))
            .instrument(info_span!("traffic.bandwidth_cluster.read", bandwidth_cluster_id = id))
            .await
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        prior: &Self::State,
        planned: &Self::State,
        changes: &ChangeSet,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>> {
        let id = require_id(prior.id.as_deref(), "bandwidth cluster")?;
        reject_force_new(changes, &FORCE_NEW)?;

        // The remote has no rename action
        if changes.has("name") {
            diags.error(
                "name modification is not supported for bandwidth clusters",
                Some(format!(
                    "bandwidth cluster `{id}` keeps the name `{}`",
                    prior.name
                )),
            );
            return Ok(Some(prior.clone()));
        }

        if !changes.has("commit_bandwidth_mbps") {
            return Ok(Some(BandwidthClusterState {
                id: prior.id.clone(),
                status: prior.status.clone(),
                create_time: prior.create_time.clone(),
                ..planned.clone()
            }));
        }

        let span = info_span!("traffic.bandwidth_cluster.update", bandwidth_cluster_id = id);
        async {
            let deadline = ctx.deadline(Operation::Update);
            let request = UpdateBandwidthClusterCommitBandwidthRequest {
                bandwidth_cluster_id: id.to_string(),
                commit_bandwidth_mbps: planned.commit_bandwidth_mbps,
            };
            retry_call(ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                self.api.update_bandwidth_cluster_commit_bandwidth(&request)
            })
            .await
            .map_err(|err| {
                err.context(format!(
                    "failed to update commit bandwidth of bandwidth cluster `{id}`"
                ))
            })?;

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
        let id = require_id(current.id.as_deref(), "bandwidth cluster")?;
        let span = info_span!("traffic.bandwidth_cluster.delete", bandwidth_cluster_id = id);
        async {
            let deadline = ctx.deadline(Operation::Delete);
            let exists = self
                .wait_until_empty(ctx, id, deadline.remaining())
                .await
                .map_err(|err| err.context(format!("failed to delete bandwidth cluster `{id}`")))?;
            if !exists {
                info!("bandwidth cluster already gone");
                return Ok(());
            }

            let request = DeleteBandwidthClusterRequest {
                bandwidth_cluster_id: id.to_string(),
            };
            let policy = ErrorPolicy::for_delete().retry_on(CLUSTER_INSTANCE_ASSOCIATED);
            retry_call(ctx, deadline.remaining(), &policy, || {
                self.api.delete_bandwidth_cluster(&request)
            })
            .await
            .map_err(|err| err.context(format!("failed to delete bandwidth cluster `{id}`")))?;
            Ok(())
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
            .instrument(info_span!("traffic.bandwidth_cluster.import", bandwidth_cluster_id = id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_info_keeps_commit_bandwidth() {
        let state = BandwidthClusterState::from_info(BandwidthClusterInfo {
            bandwidth_cluster_id: "bwc-1".to_string(),
            bandwidth_cluster_name: "edge".to_string(),
            area_code: "SEA".to_string(),
            commit_bandwidth_mbps: 500,
            status: Some("ACTIVE".to_string()),
            create_time: None,
        });
        assert_eq!(state.id.as_deref(), Some("bwc-1"));
        assert_eq!(state.commit_bandwidth_mbps, 500);
    }
}
