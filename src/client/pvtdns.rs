//! Private DNS zone records (`zdns` service)

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::rest::ApiClient;
use super::ListResponse;
use crate::engine::error::ProviderResult;

pub const SERVICE: &str = "zdns";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateZoneRecord {
    pub record_id: String,
    #[serde(default)]
    pub zone_id: String,
    pub record_name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub ttl: u32,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPrivateZoneRecordRequest {
    pub zone_id: String,
    pub record_name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPrivateZoneRecordResponse {
    pub record_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribePrivateZoneRecordsRequest {
    pub zone_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub record_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyPrivateZoneRecordRequest {
    pub zone_id: String,
    pub record_id: String,
    pub value: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePrivateZoneRecordRequest {
    pub zone_id: String,
    pub record_ids: Vec<String>,
}

#[async_trait]
pub trait PrivateDnsApi: Send + Sync {
    async fn add_private_zone_record(
        &self,
        request: &AddPrivateZoneRecordRequest,
    ) -> ProviderResult<AddPrivateZoneRecordResponse>;

    async fn describe_private_zone_records(
        &self,
        request: &DescribePrivateZoneRecordsRequest,
    ) -> ProviderResult<ListResponse<PrivateZoneRecord>>;

    async fn modify_private_zone_record(&self, request: &ModifyPrivateZoneRecordRequest) -> ProviderResult<()>;

    async fn delete_private_zone_record(&self, request: &DeletePrivateZoneRecordRequest) -> ProviderResult<()>;
}

/// REST implementation of [`PrivateDnsApi`]
#[derive(Debug, Clone)]
pub struct PrivateDnsClient {
    api: Arc<ApiClient>,
}

impl PrivateDnsClient {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PrivateDnsApi for PrivateDnsClient {
    async fn add_private_zone_record(
        &self,
        request: &AddPrivateZoneRecordRequest,
    ) -> ProviderResult<AddPrivateZoneRecordResponse> {
        self.api.call(SERVICE, "AddPrivateZoneRecord", request).await
    }

    async fn describe_private_zone_records(
        &self,
        request: &DescribePrivateZoneRecordsRequest,
    ) -> ProviderResult<ListResponse<PrivateZoneRecord>> {
        self.api
            .call(SERVICE, "DescribePrivateZoneRecords", request)
            .await
    }

    async fn modify_private_zone_record(&self, request: &ModifyPrivateZoneRecordRequest) -> ProviderResult<()> {
        self.api
            .call::<_, IgnoredAny>(SERVICE, "ModifyPrivateZoneRecord", request)
            .await
            .map(|_| ())
    }

    async fn delete_private_zone_record(&self, request: &DeletePrivateZoneRecordRequest) -> ProviderResult<()> {
        self.api
            .call::<_, IgnoredAny>(SERVICE, "DeletePrivateZoneRecord", request)
            .await
            .map(|_| ())
    }
}
