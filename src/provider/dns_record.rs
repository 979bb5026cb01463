//! # Private DNS Record
//!
//! Records live inside a private zone and are identified as
//! `zoneId:recordId`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{field, info, info_span, Instrument, Span};

use crate::client::pvtdns::{
    AddPrivateZoneRecordRequest, DeletePrivateZoneRecordRequest,
    DescribePrivateZoneRecordsRequest, ModifyPrivateZoneRecordRequest, PrivateZoneRecord,
};
use crate::client::PrivateDnsApi;
use crate::engine::classify::ErrorPolicy;
use crate::engine::context::{Operation, OperationContext};
use crate::engine::error::{ErrorCode, ProviderError, ProviderResult};
use crate::engine::id::{format_id, parse_pair};
use crate::engine::retry::retry_call;
use crate::provider::{reject_force_new, require_id, ChangeSet, Diagnostics, ResourceLifecycle};

const FORCE_NEW: [&str; 3] = ["zone_id", "record_name", "record_type"];

/// Attributes sent together in one `ModifyPrivateZoneRecord` call
const ATTRIBUTES: [&str; 6] = ["value", "ttl", "weight", "priority", "status", "remark"];

fn default_ttl() -> u32 {
    60
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordState {
    #[serde(default)]
    pub id: Option<String>,
    pub zone_id: String,
    pub record_name: String,
    pub record_type: String,
    pub value: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,

    // Computed
    #[serde(default)]
    pub record_id: Option<String>,
}

impl DnsRecordState {
    fn from_record(zone_id: &str, record: PrivateZoneRecord) -> Self {
        Self {
            id: Some(format_id(&[zone_id, &record.record_id])),
            zone_id: zone_id.to_string(),
            record_name: record.record_name,
            record_type: record.record_type,
            value: record.value,
            ttl: record.ttl,
            weight: record.weight,
            priority: record.priority,
            status: record.status,
            remark: record.remark,
            record_id: Some(record.record_id),
        }
    }
}

/// `zenlayercloud_pvtdns_record`
pub struct DnsRecord {
    api: Arc<dyn PrivateDnsApi>,
}

impl std::fmt::Debug for DnsRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsRecord").finish_non_exhaustive()
    }
}

impl DnsRecord {
    #[must_use]
    pub fn new(api: Arc<dyn PrivateDnsApi>) -> Self {
        Self { api }
    }

    async fn read_by_id(
        &self,
        ctx: &OperationContext,
        id: &str,
        timeout: Duration,
    ) -> ProviderResult<Option<DnsRecordState>> {
        let (zone_id, record_id) = parse_pair(id)?;
        let request = DescribePrivateZoneRecordsRequest {
            zone_id: zone_id.clone(),
            record_ids: vec![record_id.clone()],
            ..Default::default()
        };
        let policy = ErrorPolicy::new().ignore(ErrorCode::ResourceNotFound);
        let response = retry_call(ctx, timeout, &policy, || {
            self.api.describe_private_zone_records(&request)
        })
        .await
        .map_err(|err| err.context(format!("failed to read dns record `{id}`")))?;

        Ok(response
            .and_then(|list| {
                list.data_set
                    .into_iter()
                    .find(|record| record.record_id == record_id)
            })
            .map(|record| DnsRecordState::from_record(&zone_id, record)))
    }
}

#[async_trait]
impl ResourceLifecycle for DnsRecord {
    type State = DnsRecordState;

    const TYPE_NAME: &'static str = "zenlayercloud_pvtdns_record";

    fn id(state: &Self::State) -> Option<&str> {
        state.id.as_deref()
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        state: &mut Self::State,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let span = info_span!("pvtdns.record.create", zone_id = %state.zone_id, record_id = field::Empty);
        async {
            let deadline = ctx.deadline(Operation::Create);
            let request = AddPrivateZoneRecordRequest {
                zone_id: state.zone_id.clone(),
                record_name: state.record_name.clone(),
                record_type: state.record_type.clone(),
                value: state.value.clone(),
                ttl: state.ttl,
                weight: state.weight,
                priority: state.priority,
                status: state.status.clone(),
                remark: state.remark.clone(),
            };
            let record_id = retry_call(ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                self.api.add_private_zone_record(&request)
            })
            .await
            .map_err(|err| {
                err.context(format!("failed to add record to zone `{}`", request.zone_id))
            })?
            .map(|response| response.record_id)
            .ok_or_else(|| ProviderError::Internal("add returned no record id".to_string()))?;

            Span::current().record("record_id", record_id.as_str());
            info!(%record_id, "dns record created");
            let id = format_id(&[&state.zone_id, &record_id]);
            state.id = Some(id.clone());
            state.record_id = Some(record_id);

            match self.read_by_id(ctx, &id, deadline.remaining()).await? {
                Some(created) => {
                    *state = created;
                    Ok(())
                }
                None => Err(ProviderError::Pending(format!(
                    "dns record `{id}` is not visible after create"
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
        let id = require_id(current.id.as_deref(), "dns record")?;
        self.read_by_id(ctx, id, ctx.budget(Operation::Read))
            .instrument(info_span!("pvtdns.record.read", id))
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
        let id = require_id(prior.id.as_deref(), "dns record")?;
        reject_force_new(changes, &FORCE_NEW)?;
        if !changes.has_any(&ATTRIBUTES) {
            return Ok(Some(DnsRecordState {
                id: prior.id.clone(),
                record_id: prior.record_id.clone(),
                ..planned.clone()
            }));
        }

        let span = info_span!("pvtdns.record.update", id);
        async {
            let deadline = ctx.deadline(Operation::Update);
            let (zone_id, record_id) = parse_pair(id)?;
            let request = ModifyPrivateZoneRecordRequest {
                zone_id,
                record_id,
                value: planned.value.clone(),
                ttl: planned.ttl,
                weight: planned.weight,
                priority: planned.priority,
                status: planned.status.clone(),
                remark: planned.remark.clone(),
            };
            retry_call(ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                self.api.modify_private_zone_record(&request)
            })
            .await
            .map_err(|err| err.context(format!("failed to modify dns record `{id}`")))?;

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
        let id = require_id(current.id.as_deref(), "dns record")?;
        let (zone_id, record_id) = parse_pair(id)?;
        let request = DeletePrivateZoneRecordRequest {
            zone_id,
            record_ids: vec![record_id],
        };
        retry_call(ctx, ctx.budget(Operation::Delete), &ErrorPolicy::for_delete(), || {
            self.api.delete_private_zone_record(&request)
        })
        .instrument(info_span!("pvtdns.record.delete", id))
        .await
        .map_err(|err| err.context(format!("failed to delete dns record `{id}`")))?;
        Ok(())
    }

    async fn import(
        &self,
        ctx: &OperationContext,
        id: &str,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>> {
        self.read_by_id(ctx, id, ctx.budget(Operation::Read))
            .instrument(info_span!("pvtdns.record.import", id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_record_builds_composite_id() {
        let record = PrivateZoneRecord {
            record_id: "rec-9".to_string(),
            zone_id: String::new(),
            record_name: "www".to_string(),
            record_type: "A".to_string(),
            value: "10.0.0.9".to_string(),
            ttl: 300,
            weight: None,
            priority: None,
            status: Some("ENABLED".to_string()),
            remark: None,
        };
        let state = DnsRecordState::from_record("zone-1", record);
        assert_eq!(state.id.as_deref(), Some("zone-1:rec-9"));
        assert_eq!(state.zone_id, "zone-1");
        assert_eq!(state.ttl, 300);
    }
}
