//! Bandwidth clusters (`traffic` service)

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::rest::ApiClient;
use super::ListResponse;
use crate::engine::error::ProviderResult;

pub const SERVICE: &str = "traffic";

/// Delete rejected because instances are still attached to the cluster
pub const CLUSTER_INSTANCE_ASSOCIATED: &str = "INVALID_CLUSTER_INSTANCE_ASSOCIATED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandwidthClusterInfo {
    pub bandwidth_cluster_id: String,
    #[serde(default)]
    pub bandwidth_cluster_name: String,
    #[serde(default)]
    pub area_code: String,
    #[serde(default)]
    pub commit_bandwidth_mbps: u32,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandwidthClusterResource {
    pub resource_id: String,
    #[serde(default)]
    pub resource_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBandwidthClusterRequest {
    pub area_code: String,
    pub bandwidth_cluster_name: String,
    pub commit_bandwidth_mbps: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBandwidthClusterResponse {
    pub bandwidth_cluster_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeBandwidthClustersRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bandwidth_cluster_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBandwidthClusterCommitBandwidthRequest {
    pub bandwidth_cluster_id: String,
    pub commit_bandwidth_mbps: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeBandwidthClusterResourcesRequest {
    pub bandwidth_cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBandwidthClusterRequest {
    pub bandwidth_cluster_id: String,
}

#[async_trait]
pub trait TrafficApi: Send + Sync {
    async fn create_bandwidth_cluster(
        &self,
        request: &CreateBandwidthClusterRequest,
    ) -> ProviderResult<CreateBandwidthClusterResponse>;

    async fn describe_bandwidth_clusters(
        &self,
        request: &DescribeBandwidthClustersRequest,
    ) -> ProviderResult<ListResponse<BandwidthClusterInfo>>;

    async fn update_bandwidth_cluster_commit_bandwidth(
        &self,
        request: &UpdateBandwidthClusterCommitBandwidthRequest,
    ) -> ProviderResult<()>;

    async fn describe_bandwidth_cluster_resources(
        &self,
        request: &DescribeBandwidthClusterResourcesRequest,
    ) -> ProviderResult<ListResponse<BandwidthClusterResource>>;

    async fn delete_bandwidth_cluster(&self, request: &DeleteBandwidthClusterRequest) -> ProviderResult<()>;
}

/// REST implementation of [`TrafficApi`]
#[derive(Debug, Clone)]
pub struct TrafficClient {
    api: Arc<ApiClient>,
}

impl TrafficClient {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl TrafficApi for TrafficClient {
    async fn create_bandwidth_cluster(
        &self,
        request: &CreateBandwidthClusterRequest,
    ) -> ProviderResult<CreateBandwidthClusterResponse> {
        self.api.call(SERVICE, "CreateBandwidthCluster", request).await
    }

    async fn describe_bandwidth_clusters(
        &self,
        request: &DescribeBandwidthClustersRequest,
    ) -> ProviderResult<ListResponse<BandwidthClusterInfo>> {
        self.api
            .call(SERVICE, "DescribeBandwidthClusters", request)
            .await
    }

    async fn update_bandwidth_cluster_commit_bandwidth(
        &self,
        request: &UpdateBandwidthClusterCommitBandwidthRequest,
    ) -> ProviderResult<()> {
        self.api
            .call::<_, IgnoredAny>(SERVICE, "UpdateBandwidthClusterCommitBandwidth", request)
            .await
            .map(|_| ())
    }

    async fn describe_bandwidth_cluster_resources(
        &self,
        request: &DescribeBandwidthClusterResourcesRequest,
    ) -> ProviderResult<ListResponse<BandwidthClusterResource>> {
        self.api
            .call(SERVICE, "DescribeBandwidthClusterResources", request)
            .await
    }

    async fn delete_bandwidth_cluster(&self, request: &DeleteBandwidthClusterRequest) -> ProviderResult<()> {
        self.api
            .call::<_, IgnoredAny>(SERVICE, "DeleteBandwidthCluster", request)
            .await
            .map(|_| ())
    }
}
