//! # Key Pair
//!
//! SSH public keys registered with the `vm` service. Only the description can
//! be changed in place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, Instrument};

use crate::client::keypair::{
    CreateKeyPairRequest, DeleteKeyPairRequest, DescribeKeyPairsRequest, KeyPairInfo,
    ModifyKeyPairAttributeRequest,
};
use crate::client::KeyPairApi;
use crate::engine::classify::ErrorPolicy;
use crate::engine::context::{Operation, OperationContext};
use crate::engine::error::{ErrorCode, ProviderError, ProviderResult};
use crate::engine::retry::retry_call;
use crate::provider::{reject_force_new, require_id, ChangeSet, Diagnostics, ResourceLifecycle};

const FORCE_NEW: [&str; 2] = ["key_name", "public_key"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairState {
    #[serde(default)]
    pub id: Option<String>,
    pub key_name: String,
    pub public_key: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
}

impl KeyPairState {
    pub(crate) fn from_info(info: KeyPairInfo) -> Self {
        Self {
            id: Some(info.key_id),
            key_name: info.key_name,
            public_key: info.public_key,
            description: info.key_description.filter(|d| !d.is_empty()),
            create_time: info.create_time,
        }
    }
}

/// `zenlayercloud_key_pair`
pub struct KeyPair {
    api: Arc<dyn KeyPairApi>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").finish_non_exhaustive()
    }
}

impl KeyPair {
    #[must_use]
    pub fn new(api: Arc<dyn KeyPairApi>) -> Self {
        Self { api }
    }

    async fn read_by_id(
        &self,
        ctx: &OperationContext,
        id: &str,
        timeout: Duration,
    ) -> ProviderResult<Option<KeyPairState>> {
        let request = DescribeKeyPairsRequest {
            key_ids: vec![id.to_string()],
            ..Default::default()
        };
        let policy = ErrorPolicy::new().ignore(ErrorCode::ResourceNotFound);
        let response = retry_call(ctx, timeout, &policy, || self.api.describe_key_pairs(&request))
            .await
            .map_err(|err| err.context(format!("failed to read key pair `{id}`")))?;

        Ok(response
            .and_then(|list| list.data_set.into_iter().find(|key| key.key_id == id))
            .map(KeyPairState::from_info))
    }
}

#[async_trait]
impl ResourceLifecycle for KeyPair {
    type State = KeyPairState;

    const TYPE_NAME: &'static str = "zenlayercloud_key_pair";

    fn id(state: &Self::State) -> Option<&str> {
        state.id.as_deref()
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        state: &mut Self::State,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let span = info_span!("keypair.create", key_name = %state.key_name);
        async {
            let deadline = ctx.deadline(Operation::Create);
            let request = CreateKeyPairRequest {
                key_name: state.key_name.clone(),
                public_key: state.public_key.clone(),
                key_description: state.description.clone(),
            };
            let key_id = retry_call(ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                self.api.create_key_pair(&request)
            })
            .await
            .map_err(|err| err.context(format!("failed to create key pair `{}`", request.key_name)))?
            .map(|response| response.key_id)
            .ok_or_else(|| ProviderError::Internal("create returned no key id".to_string()))?;

            info!(%key_id, "key pair created");
            state.id = Some(key_id.clone());

            match self.read_by_id(ctx, &key_id, deadline.remaining()).await? {
                Some(created) => {
                    *state = created;
                    Ok(())
                }
                None => Err(ProviderError::Pending(format!(
                    "key pair `{key_id}` is not visible after create"
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
        let id = require_id(current.id.as_deref(), "key pair")?;
        self.read_by_id(ctx, id, ctx.budget(Operation::Read))
            .instrument(info_span!("keypair.read", key_id = id))
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
        let id = require_id(prior.id.as_deref(), "key pair")?;
        reject_force_new(changes, &FORCE_NEW)?;
        if !changes.has("description") {
            return Ok(Some(KeyPairState {
                id: prior.id.clone(),
                create_time: prior.create_time.clone(),
                ..planned.clone()
            }));
        }

        let span = info_span!("keypair.update", key_id = id);
        async {
            let deadline = ctx.deadline(Operation::Update);
            let request = ModifyKeyPairAttributeRequest {
                key_id: id.to_string(),
                key_description: planned.description.clone().unwrap_or_default(),
            };
            retry_call(ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                self.api.modify_key_pair_attribute(&request)
            })
            .await
            .map_err(|err| err.context(format!("failed to modify key pair `{id}`")))?;

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
        let id = require_id(current.id.as_deref(), "key pair")?;
        let request = DeleteKeyPairRequest {
            key_id: id.to_string(),
        };
        let deleted = retry_call(ctx, ctx.budget(Operation::Delete), &ErrorPolicy::for_delete(), || {
            self.api.delete_key_pair(&request)
        })
        .instrument(info_span!("keypair.delete", key_id = id))
        .await
        .map_err(|err| err.context(format!("failed to delete key pair `{id}`")))?;
        if deleted.is_none() {
            info!(key_id = id, "key pair was already deleted");
        }
        Ok(())
    }

    async fn import(
        &self,
        ctx: &OperationContext,
        id: &str,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Self::State>> {
        self.read_by_id(ctx, id, ctx.budget(Operation::Read))
            .instrument(info_span!("keypair.import", key_id = id))
            .await
    }
}
