//! Load balancer service (`zlb`)
//!
//! Instances, listeners and backend servers.

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::rest::ApiClient;
use super::ListResponse;
use crate::engine::error::ProviderResult;

pub const SERVICE: &str = "zlb";

/// Listener lookup failure reported while a new listener propagates
pub const LISTENER_NOT_FOUND: &str = "INVALID_LB_LISTENER_NOT_FOUND";

/// Load balancer status as reported by the remote
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LoadBalancerStatus {
    Creating,
    Available,
    CreateFailed,
    Releasing,
    Recycle,
    Running,
    Unknown(String),
}

impl LoadBalancerStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::Available => "AVAILABLE",
            Self::CreateFailed => "CREATE_FAILED",
            Self::Releasing => "RELEASING",
            Self::Recycle => "RECYCLE",
            Self::Running => "RUNNING",
            Self::Unknown(status) => status,
        }
    }
}

impl From<String> for LoadBalancerStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "CREATING" => Self::Creating,
            "AVAILABLE" => Self::Available,
            "CREATE_FAILED" => Self::CreateFailed,
            "RELEASING" => Self::Releasing,
            "RECYCLE" => Self::Recycle,
            "RUNNING" => Self::Running,
            _ => Self::Unknown(status),
        }
    }
}

impl From<LoadBalancerStatus> for String {
    fn from(status: LoadBalancerStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for LoadBalancerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerInfo {
    pub load_balancer_id: String,
    #[serde(default)]
    pub load_balancer_name: String,
    #[serde(default)]
    pub region_id: String,
    #[serde(default)]
    pub vpc_id: String,
    pub status: LoadBalancerStatus,
    #[serde(default)]
    pub security_group_id: Option<String>,
    #[serde(default)]
    pub resource_group_id: Option<String>,
    #[serde(default)]
    pub private_ip_address: Vec<String>,
    #[serde(default)]
    pub public_ip_address: Vec<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoadBalancerRequest {
    pub region_id: String,
    pub vpc_id: String,
    pub load_balancer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoadBalancerResponse {
    #[serde(default)]
    pub load_balancer_ids: Vec<String>,
    #[serde(default)]
    pub order_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLoadBalancersRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub load_balancer_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyLoadBalancersAttributeRequest {
    pub load_balancer_ids: Vec<String>,
    pub load_balancer_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyLoadBalancerSecurityGroupRequest {
    pub load_balancer_id: String,
    pub security_group_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyLoadBalancerResourceGroupRequest {
    pub load_balancer_id: String,
    pub resource_group_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateLoadBalancerRequest {
    pub load_balancer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerInfo {
    pub listener_id: String,
    #[serde(default)]
    pub listener_name: String,
    pub protocol: String,
    pub port: u32,
    #[serde(default)]
    pub scheduler: String,
    #[serde(default)]
    pub health_check_enabled: bool,
    #[serde(default)]
    pub health_check_type: Option<String>,
    #[serde(default)]
    pub health_check_port: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListenerRequest {
    pub load_balancer_id: String,
    pub listener_name: String,
    pub protocol: String,
    pub port: u32,
    pub scheduler: String,
    pub health_check_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_port: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListenerResponse {
    pub listener_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeListenersRequest {
    pub load_balancer_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub listener_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyListenerRequest {
    pub load_balancer_id: String,
    pub listener_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_port: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteListenerRequest {
    pub load_balancer_id: String,
    pub listener_id: String,
}

/// A backend server attached to a listener
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendServer {
    pub instance_id: String,
    pub private_ip_address: String,
    pub port: u32,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeBackendsRequest {
    pub load_balancer_id: String,
    pub listener_id: String,
}

/// Request shared by register, deregister and weight modification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendServersRequest {
    pub load_balancer_id: String,
    pub listener_id: String,
    pub backend_servers: Vec<BackendServer>,
}

/// Load balancer API surface used by the lifecycle shells
#[async_trait]
pub trait SlbApi: Send + Sync {
    async fn create_load_balancer(
        &self,
        request: &CreateLoadBalancerRequest,
    ) -> ProviderResult<CreateLoadBalancerResponse>;

    async fn describe_load_balancers(
        &self,
        request: &DescribeLoadBalancersRequest,
    ) -> ProviderResult<ListResponse<LoadBalancerInfo>>;

    async fn modify_load_balancers_attribute(
        &self,
        request: &ModifyLoadBalancersAttributeRequest,
    ) -> ProviderResult<()>;

    async fn modify_load_balancer_security_group(
        &self,
        request: &ModifyLoadBalancerSecurityGroupRequest,
    ) -> ProviderResult<()>;

    async fn modify_load_balancer_resource_group(
        &self,
        request: &ModifyLoadBalancerResourceGroupRequest,
    ) -> ProviderResult<()>;

    async fn terminate_load_balancer(&self, request: &TerminateLoadBalancerRequest) -> ProviderResult<()>;

    async fn create_listener(
        &self,
        request: &CreateListenerRequest,
    ) -> ProviderResult<CreateListenerResponse>;

    async fn describe_listeners(
        &self,
        request: &DescribeListenersRequest,
    ) -> ProviderResult<ListResponse<ListenerInfo>>;

    async fn modify_listener(&self, request: &ModifyListenerRequest) -> ProviderResult<()>;

    async fn delete_listener(&self, request: &DeleteListenerRequest) -> ProviderResult<()>;

    async fn describe_backends(
        &self,
        request: &DescribeBackendsRequest,
    ) -> ProviderResult<ListResponse<BackendServer>>;

    async fn register_backend(&self, request: &BackendServersRequest) -> ProviderResult<()>;

    async fn deregister_backend(&self, request: &BackendServersRequest) -> ProviderResult<()>;

    async fn modify_backends_weight(&self, request: &BackendServersRequest) -> ProviderResult<()>;
}

/// REST implementation of [`SlbApi`]
#[derive(Debug, Clone)]
pub struct SlbClient {
    api: Arc<ApiClient>,
}

impl SlbClient {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    async fn invoke<Req: Serialize + Sync>(&self, action: &str, request: &Req) -> ProviderResult<()> {
        self.api
            .call::<_, IgnoredAny>(SERVICE, action, request)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl SlbApi for SlbClient {
    async fn create_load_balancer(
        &self,
        request: &CreateLoadBalancerRequest,
    ) -> ProviderResult<CreateLoadBalancerResponse> {
        self.api.call(SERVICE, "CreateLoadBalancer", request).await
    }

    async fn describe_load_balancers(
        &self,
        request: &DescribeLoadBalancersRequest,
    ) -> ProviderResult<ListResponse<LoadBalancerInfo>> {
        self.api.call(SERVICE, "DescribeLoadBalancers", request).await
    }

    async fn modify_load_balancers_attribute(
        &self,
        request: &ModifyLoadBalancersAttributeRequest,
    ) -> ProviderResult<()> {
        self.invoke("ModifyLoadBalancersAttribute", request).await
    }

    async fn modify_load_balancer_security_group(
        &self,
        request: &ModifyLoadBalancerSecurityGroupRequest,
    ) -> ProviderResult<()> {
        self.invoke("ModifyLoadBalancerSecurityGroup", request).await
    }

    async fn modify_load_balancer_resource_group(
        &self,
        request: &ModifyLoadBalancerResourceGroupRequest,
    ) -> ProviderResult<()> {
        self.invoke("ModifyLoadBalancerResourceGroup", request).await
    }

    async fn terminate_load_balancer(&self, request: &TerminateLoadBalancerRequest) -> ProviderResult<()> {
        self.invoke("TerminateLoadBalancer", request).await
    }

    async fn create_listener(
        &self,
        request: &CreateListenerRequest,
    ) -> ProviderResult<CreateListenerResponse> {
        self.api.call(SERVICE, "CreateListener", request).await
    }

    async fn describe_listeners(
        &self,
        request: &DescribeListenersRequest,
    ) -> ProviderResult<ListResponse<ListenerInfo>> {
        self.api.call(SERVICE, "DescribeListeners", request).await
    }

    async fn modify_listener(&self, request: &ModifyListenerRequest) -> ProviderResult<()> {
        self.invoke("ModifyListener", request).await
    }

    async fn delete_listener(&self, request: &DeleteListenerRequest) -> ProviderResult<()> {
        self.invoke("DeleteListener", request).await
    }

    async fn describe_backends(
        &self,
        request: &DescribeBackendsRequest,
    ) -> ProviderResult<ListResponse<BackendServer>> {
        self.api.call(SERVICE, "DescribeBackends", request).await
    }

    async fn register_backend(&self, request: &BackendServersRequest) -> ProviderResult<()> {
        self.invoke("RegisterBackend", request).await
    }

    async fn deregister_backend(&self, request: &BackendServersRequest) -> ProviderResult<()> {
        self.invoke("DeregisterBackend", request).await
    }

    async fn modify_backends_weight(&self, request: &BackendServersRequest) -> ProviderResult<()> {
        self.invoke("ModifyBackendsWeight", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trips_through_strings() {
        let info: LoadBalancerInfo = serde_json::from_value(json!({
            "loadBalancerId": "zlb-1",
            "status": "CREATE_FAILED"
        }))
        .unwrap();
        assert_eq!(info.status, LoadBalancerStatus::CreateFailed);

        let status: LoadBalancerStatus = serde_json::from_value(json!("MIGRATING")).unwrap();
        assert_eq!(status, LoadBalancerStatus::Unknown("MIGRATING".to_string()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("MIGRATING"));
    }

    #[test]
    fn test_describe_request_omits_unset_filters() {
        let request = DescribeLoadBalancersRequest {
            load_balancer_ids: vec!["zlb-1".to_string()],
            ..DescribeLoadBalancersRequest::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "loadBalancerIds": ["zlb-1"] })
        );
    }
}
