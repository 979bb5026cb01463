//! Data source tests: paging, name filtering, result digests and output files

mod common;

use async_trait::async_trait;
use common::{ctx, lb_info, FakeCloud};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use zenlayercloud_provider::client::keypair::{
    CreateKeyPairRequest, CreateKeyPairResponse, DeleteKeyPairRequest, DescribeKeyPairsRequest,
    KeyPairInfo, ModifyKeyPairAttributeRequest,
};
use zenlayercloud_provider::client::{KeyPairApi, ListResponse};
use zenlayercloud_provider::client::slb::LoadBalancerStatus;
use zenlayercloud_provider::engine::digest::result_digest;
use zenlayercloud_provider::engine::context::Operation;
use zenlayercloud_provider::engine::error::{ErrorCode, ProviderError, ProviderResult};
use zenlayercloud_provider::engine::paginate::Paginator;
use zenlayercloud_provider::provider::data_source::load_balancers::LoadBalancersQuery;
use zenlayercloud_provider::provider::data_source::{KeyPairsDataSource, LoadBalancersDataSource};
use zenlayercloud_provider::provider::{DataSource, Diagnostics};

fn cloud_with_load_balancers(count: usize) -> Arc<FakeCloud> {
    let cloud = FakeCloud::new();
    for n in 0..count {
        cloud.add_load_balancer(lb_info(
            &format!("zlb-{n:03}"),
            &format!("web-{n:03}"),
            LoadBalancerStatus::Running,
        ));
    }
    cloud
}

#[tokio::test(start_paused = true)]
async fn test_lists_every_page_in_order() {
    let cloud = cloud_with_load_balancers(250);
    let data_source = LoadBalancersDataSource::new(Arc::<FakeCloud>::clone(&cloud))
        .with_paginator(Paginator::new(100, 50));

    let result = data_source
        .read(&ctx(), &LoadBalancersQuery::default(), &mut Diagnostics::new())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 250);
    let ids: Vec<&str> = result.items.iter().map(|lb| lb.id.as_deref().unwrap()).collect();
    let expected: Vec<String> = (0..250).map(|n| format!("zlb-{n:03}")).collect();
    assert_eq!(ids, expected);
    assert_eq!(result.id, result_digest(&expected));
    assert_eq!(cloud.count("DescribeLoadBalancers"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_single_page_makes_one_call() {
    let cloud = cloud_with_load_balancers(37);
    let data_source = LoadBalancersDataSource::new(Arc::<FakeCloud>::clone(&cloud));

    let result = data_source
        .read(&ctx(), &LoadBalancersQuery::default(), &mut Diagnostics::new())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 37);
    assert_eq!(cloud.count("DescribeLoadBalancers"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_name_regex_and_result_file() {
    let cloud = cloud_with_load_balancers(250);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zlb.json");
    let query = LoadBalancersQuery {
        name_regex: Some("^web-1[0-4]".to_string()),
        result_output_file: Some(path.clone()),
        ..Default::default()
    };

    let result = LoadBalancersDataSource::new(Arc::<FakeCloud>::clone(&cloud))
        .read(&ctx(), &query, &mut Diagnostics::new())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 50);
    assert!(result.items.iter().all(|lb| lb.name.starts_with("web-1")));

    let written: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.len(), 50);
    assert_eq!(written[0]["id"], "zlb-100");
}

#[tokio::test(start_paused = true)]
async fn test_listing_failure_becomes_error_diagnostic() {
    let cloud = cloud_with_load_balancers(10);
    cloud.fail_next(
        "DescribeLoadBalancers",
        ProviderError::vendor("AUTH_FAILED", "signature mismatch"),
    );
    let provider = cloud.provider();

    let response = provider
        .data_source("zenlayercloud_zlb_instances")
        .unwrap()
        .read(&ctx(), json!({}))
        .await;

    assert!(response.state.is_none());
    assert_eq!(response.diagnostics[0].code.as_deref(), Some("AUTH_FAILED"));
    assert!(response.diagnostics[0]
        .detail
        .as_deref()
        .unwrap()
        .contains("failed to list load balancers"));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_regex_is_reported() {
    let cloud = cloud_with_load_balancers(1);
    let provider = cloud.provider();

    let response = provider
        .data_source("zenlayercloud_zlb_instances")
        .unwrap()
        .read(&ctx(), json!({ "name_regex": "web-(" }))
        .await;

    assert!(response.has_errors());
    assert!(cloud.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_key_pairs_filtered_by_name() {
    let cloud = FakeCloud::new();
    cloud.add_key_pair("key-1", "deploy-ci");
    cloud.add_key_pair("key-2", "deploy-prod");
    cloud.add_key_pair("key-3", "admin");

    let result = KeyPairsDataSource::new(Arc::<FakeCloud>::clone(&cloud))
        .read(
            &ctx(),
            &serde_json::from_value(json!({ "name_regex": "^deploy-" })).unwrap(),
            &mut Diagnostics::new(),
        )
        .await
        .unwrap();

    let names: Vec<&str> = result.items.iter().map(|key| key.key_name.as_str()).collect();
    assert_eq!(names, vec!["deploy-ci", "deploy-prod"]);
    assert_eq!(result.id, result_digest(&["key-1", "key-2"]));
    assert_eq!(cloud.calls(), vec!["DescribeKeyPairs"]);
}

/// Page 1 succeeds after `page_one_failures` network errors; page 2 never does
#[derive(Debug)]
struct FlakyKeyPairs {
    page_one_failures: u32,
    page_one_calls: AtomicU32,
}

#[async_trait]
impl KeyPairApi for FlakyKeyPairs {
    async fn create_key_pair(&self, _request: &CreateKeyPairRequest) -> ProviderResult<CreateKeyPairResponse> {
        unreachable!("listing only")
    }

    async fn describe_key_pairs(
        &self,
        request: &DescribeKeyPairsRequest,
    ) -> ProviderResult<ListResponse<KeyPairInfo>> {
        let network_error = || ProviderError::vendor(ErrorCode::NetworkError, "connection reset");
        if request.page_num != Some(1) {
            return Err(network_error());
        }
        if self.page_one_calls.fetch_add(1, Ordering::SeqCst) < self.page_one_failures {
            return Err(network_error());
        }
        Ok(ListResponse {
            total_count: 2,
            data_set: vec![KeyPairInfo {
                key_id: "key-1".to_string(),
                key_name: "deploy".to_string(),
                public_key: String::new(),
                key_description: None,
                create_time: None,
            }],
        })
    }

    async fn modify_key_pair_attribute(&self, _request: &ModifyKeyPairAttributeRequest) -> ProviderResult<()> {
        unreachable!("listing only")
    }

    async fn delete_key_pair(&self, _request: &DeleteKeyPairRequest) -> ProviderResult<()> {
        unreachable!("listing only")
    }
}

#[tokio::test(start_paused = true)]
async fn test_page_retries_share_one_read_deadline() {
    let api = Arc::new(FlakyKeyPairs {
        page_one_failures: 110,
        page_one_calls: AtomicU32::new(0),
    });
    let ctx = ctx();
    let budget = ctx.budget(Operation::Read);
    let started = tokio::time::Instant::now();

    let err = KeyPairsDataSource::new(api)
        .with_paginator(Paginator::new(1, 50))
        .read(&ctx, &serde_json::from_value(json!({})).unwrap(), &mut Diagnostics::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "TIMEOUT_EXHAUSTED");
    // 110 failures at a 2s interval leave page 2 only what page 1 did not use
    assert!(
        started.elapsed() <= budget,
        "listing ran {:?} against a budget of {budget:?}",
        started.elapsed()
    );
}
