//! SSH key pairs (`vm` service)

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::rest::ApiClient;
use super::ListResponse;
use crate::engine::error::ProviderResult;

pub const SERVICE: &str = "vm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairInfo {
    pub key_id: String,
    pub key_name: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub key_description: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyPairRequest {
    pub key_name: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyPairResponse {
    pub key_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeKeyPairsRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyKeyPairAttributeRequest {
    pub key_id: String,
    /// An empty string clears the description
    pub key_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteKeyPairRequest {
    pub key_id: String,
}

#[async_trait]
pub trait KeyPairApi: Send + Sync {
    async fn create_key_pair(&self, request: &CreateKeyPairRequest) -> ProviderResult<CreateKeyPairResponse>;

    async fn describe_key_pairs(
        &self,
        request: &DescribeKeyPairsRequest,
    ) -> ProviderResult<ListResponse<KeyPairInfo>>;

    async fn modify_key_pair_attribute(&self, request: &ModifyKeyPairAttributeRequest) -> ProviderResult<()>;

    async fn delete_key_pair(&self, request: &DeleteKeyPairRequest) -> ProviderResult<()>;
}

/// REST implementation of [`KeyPairApi`]
#[derive(Debug, Clone)]
pub struct KeyPairClient {
    api: Arc<ApiClient>,
}

impl KeyPairClient {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl KeyPairApi for KeyPairClient {
    async fn create_key_pair(&self, request: &CreateKeyPairRequest) -> ProviderResult<CreateKeyPairResponse> {
        self.api.call(SERVICE, "CreateKeyPair", request).await
    }

    async fn describe_key_pairs(
        &self,
        request: &DescribeKeyPairsRequest,
    ) -> ProviderResult<ListResponse<KeyPairInfo>> {
        self.api.call(SERVICE, "DescribeKeyPairs", request).await
    }

    async fn modify_key_pair_attribute(&self, request: &ModifyKeyPairAttributeRequest) -> ProviderResult<()> {
        self.api
            .call::<_, IgnoredAny>(SERVICE, "ModifyKeyPairAttribute", request)
            .await
            .map(|_| ())
    }

    async fn delete_key_pair(&self, request: &DeleteKeyPairRequest) -> ProviderResult<()> {
        self.api
            .call::<_, IgnoredAny>(SERVICE, "DeleteKeyPair", request)
            .await
            .map(|_| ())
    }
}
