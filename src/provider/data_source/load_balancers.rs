//! `zenlayercloud_zlb_instances`

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

use super::{compile_name_regex, retain_matching, write_result_file};
use crate::client::slb::DescribeLoadBalancersRequest;
use crate::client::SlbApi;
use crate::engine::classify::ErrorPolicy;
use crate::engine::context::{Operation, OperationContext};
use crate::engine::digest::result_digest;
use crate::engine::error::{ProviderError, ProviderResult};
use crate::engine::paginate::{Page, PageRequest, Paginator};
use crate::engine::retry::retry_call;
use crate::provider::load_balancer::instance::LoadBalancerState;
use crate::provider::{DataSource, DataSourceResult, Diagnostics};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoadBalancersQuery {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub name_regex: Option<String>,
    #[serde(default)]
    pub result_output_file: Option<PathBuf>,
}

pub struct LoadBalancersDataSource {
    api: Arc<dyn SlbApi>,
    paginator: Paginator,
}

impl std::fmt::Debug for LoadBalancersDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancersDataSource")
            .field("paginator", &self.paginator)
            .finish_non_exhaustive()
    }
}

impl LoadBalancersDataSource {
    #[must_use]
    pub fn new(api: Arc<dyn SlbApi>) -> Self {
        Self {
            api,
            paginator: Paginator::default(),
        }
    }

    #[must_use]
    pub fn with_paginator(mut self, paginator: Paginator) -> Self {
        self.paginator = paginator;
        self
    }
}

#[async_trait]
impl DataSource for LoadBalancersDataSource {
    type Query = LoadBalancersQuery;
    type Item = LoadBalancerState;

    const TYPE_NAME: &'static str = "zenlayercloud_zlb_instances";

    async fn read(
        &self,
        ctx: &OperationContext,
        query: &Self::Query,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<DataSourceResult<Self::Item>> {
        let filter = compile_name_regex(query.name_regex.as_deref())?;
        let base = DescribeLoadBalancersRequest {
            load_balancer_ids: query.ids.clone(),
            region_id: query.region_id.clone(),
            vpc_id: query.vpc_id.clone(),
            ..Default::default()
        };

        let api = Arc::clone(&self.api);
        let page_ctx = ctx.clone();
        // One deadline for the whole listing, not one per page
        let deadline = ctx.deadline(Operation::Read);
        let fetch = move |page: PageRequest| {
            let api = Arc::clone(&api);
            let ctx = page_ctx.clone();
            let request = DescribeLoadBalancersRequest {
                page_num: Some(page.page_num),
                page_size: Some(page.page_size),
                ..base.clone()
            };
            async move {
                let response = retry_call(&ctx, deadline.remaining(), &ErrorPolicy::new(), || {
                    api.describe_load_balancers(&request)
                })
                .await?;
                Ok::<_, ProviderError>(Page::from(response.unwrap_or_default()))
            }
        };

        let outcome = self
            .paginator
            .list(ctx, fetch)
            .instrument(info_span!("zlb.instances.list"))
            .await;
        info!(
            pages = outcome.pages_fetched,
            items = outcome.items.len(),
            "listed load balancers"
        );
        let mut items = outcome
            .into_result()
            .map_err(|err| err.context("failed to list load balancers"))?;

        retain_matching(&mut items, filter.as_ref(), |lb| lb.load_balancer_name.as_str());
        let items: Vec<LoadBalancerState> = items.into_iter().map(LoadBalancerState::from_info).collect();
        let ids: Vec<&str> = items.iter().filter_map(|lb| lb.id.as_deref()).collect();
        let id = result_digest(&ids);

        if let Some(path) = &query.result_output_file {
            write_result_file(path, &items).await?;
        }
        Ok(DataSourceResult { id, items })
    }
}
