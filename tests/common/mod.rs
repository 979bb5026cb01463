//! Common test utilities
//!
//! An in-memory Zenlayer Cloud that implements every service trait, records
//! the actions it receives and replays scripted statuses and failures.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zenlayercloud_provider::client::keypair::{
    CreateKeyPairRequest, CreateKeyPairResponse, DeleteKeyPairRequest, DescribeKeyPairsRequest,
    KeyPairInfo, ModifyKeyPairAttributeRequest,
};
use zenlayercloud_provider::client::pvtdns::{
    AddPrivateZoneRecordRequest, AddPrivateZoneRecordResponse, DeletePrivateZoneRecordRequest,
    DescribePrivateZoneRecordsRequest, ModifyPrivateZoneRecordRequest, PrivateZoneRecord,
};
use zenlayercloud_provider::client::slb::{
    BackendServer, BackendServersRequest, CreateListenerRequest, CreateListenerResponse,
    CreateLoadBalancerRequest, CreateLoadBalancerResponse, DeleteListenerRequest,
    DescribeBackendsRequest, DescribeListenersRequest, DescribeLoadBalancersRequest, ListenerInfo,
    LoadBalancerInfo, LoadBalancerStatus, ModifyListenerRequest,
    ModifyLoadBalancerResourceGroupRequest, ModifyLoadBalancerSecurityGroupRequest,
    ModifyLoadBalancersAttributeRequest, TerminateLoadBalancerRequest,
};
use zenlayercloud_provider::client::traffic::{
    BandwidthClusterInfo, BandwidthClusterResource, CreateBandwidthClusterRequest,
    CreateBandwidthClusterResponse, DeleteBandwidthClusterRequest,
    DescribeBandwidthClusterResourcesRequest, DescribeBandwidthClustersRequest,
    UpdateBandwidthClusterCommitBandwidthRequest,
};
use zenlayercloud_provider::client::{
    KeyPairApi, ListResponse, PrivateDnsApi, SlbApi, TrafficApi, VendorClient,
};
use zenlayercloud_provider::engine::backoff::JitteredBackoff;
use zenlayercloud_provider::engine::context::{OperationContext, Timeouts};
use zenlayercloud_provider::engine::error::{ErrorCode, ProviderError, ProviderResult};
use zenlayercloud_provider::provider::Provider;

/// Context with a fixed two second backoff, for paused-clock tests
pub fn ctx() -> OperationContext {
    OperationContext::new(Timeouts::default())
        .with_backoff(JitteredBackoff::new(Duration::from_secs(2), 0.0))
}

pub fn not_found(what: &str) -> ProviderError {
    ProviderError::vendor(ErrorCode::ResourceNotFound, format!("{what} not found"))
}

pub fn lb_info(id: &str, name: &str, status: LoadBalancerStatus) -> LoadBalancerInfo {
    LoadBalancerInfo {
        load_balancer_id: id.to_string(),
        load_balancer_name: name.to_string(),
        region_id: "asia-east-1".to_string(),
        vpc_id: "vpc-1".to_string(),
        status,
        security_group_id: Some("sg-1".to_string()),
        resource_group_id: Some("rg-1".to_string()),
        private_ip_address: vec!["10.0.0.8".to_string()],
        public_ip_address: vec!["203.0.113.8".to_string()],
        create_time: Some("2026-01-01T00:00:00Z".to_string()),
    }
}

pub fn backend(instance_id: &str, ip: &str, weight: u32) -> BackendServer {
    BackendServer {
        instance_id: instance_id.to_string(),
        private_ip_address: ip.to_string(),
        port: 8080,
        weight,
    }
}

/// In-memory vendor
#[derive(Debug, Default)]
pub struct FakeCloud {
    calls: Mutex<Vec<String>>,
    failures: Mutex<BTreeMap<String, VecDeque<ProviderError>>>,
    lb_statuses: Mutex<VecDeque<LoadBalancerStatus>>,
    load_balancers: Mutex<Vec<LoadBalancerInfo>>,
    listeners: Mutex<Vec<ListenerInfo>>,
    backends: Mutex<Vec<BackendServer>>,
    backend_requests: Mutex<Vec<(String, Vec<BackendServer>)>>,
    key_pairs: Mutex<BTreeMap<String, KeyPairInfo>>,
    records: Mutex<Vec<PrivateZoneRecord>>,
    clusters: Mutex<BTreeMap<String, BandwidthClusterInfo>>,
    cluster_resource_counts: Mutex<VecDeque<u64>>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Actions received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, action: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| *call == action).count()
    }

    /// Fail the next call of `action` with `err`
    pub fn fail_next(&self, action: &str, err: ProviderError) {
        self.failures
            .lock()
            .unwrap()
            .entry(action.to_string())
            .or_default()
            .push_back(err);
    }

    /// Statuses reported by successive describes of a single load balancer;
    /// the last one sticks
    pub fn script_lb_statuses(&self, statuses: impl IntoIterator<Item = LoadBalancerStatus>) {
        *self.lb_statuses.lock().unwrap() = statuses.into_iter().collect();
    }

    pub fn add_load_balancer(&self, info: LoadBalancerInfo) {
        self.load_balancers.lock().unwrap().push(info);
    }

    pub fn add_key_pair(&self, key_id: &str, key_name: &str) {
        self.key_pairs.lock().unwrap().insert(
            key_id.to_string(),
            KeyPairInfo {
                key_id: key_id.to_string(),
                key_name: key_name.to_string(),
                public_key: "ssh-ed25519 AAAAC3Nza".to_string(),
                key_description: None,
                create_time: Some("2026-01-01T00:00:00Z".to_string()),
            },
        );
    }

    pub fn add_record(&self, zone_id: &str, record_id: &str, value: &str) {
        self.records.lock().unwrap().push(PrivateZoneRecord {
            record_id: record_id.to_string(),
            zone_id: zone_id.to_string(),
            record_name: "www".to_string(),
            record_type: "A".to_string(),
            value: value.to_string(),
            ttl: 300,
            weight: None,
            priority: None,
            status: Some("ENABLED".to_string()),
            remark: None,
        });
    }

    pub fn add_cluster(&self, id: &str, name: &str) {
        self.clusters.lock().unwrap().insert(
            id.to_string(),
            BandwidthClusterInfo {
                bandwidth_cluster_id: id.to_string(),
                bandwidth_cluster_name: name.to_string(),
                area_code: "SEA".to_string(),
                commit_bandwidth_mbps: 100,
                status: Some("ACTIVE".to_string()),
                create_time: None,
            },
        );
    }

    pub fn has_cluster(&self, id: &str) -> bool {
        self.clusters.lock().unwrap().contains_key(id)
    }

    /// Attached resource counts reported while a cluster drains; the last one sticks
    pub fn script_cluster_resources(&self, counts: impl IntoIterator<Item = u64>) {
        *self.cluster_resource_counts.lock().unwrap() = counts.into_iter().collect();
    }

    pub fn set_backends(&self, backends: Vec<BackendServer>) {
        *self.backends.lock().unwrap() = backends;
    }

    /// Backend mutations received, as `(action, servers)`
    pub fn backend_requests(&self) -> Vec<(String, Vec<BackendServer>)> {
        self.backend_requests.lock().unwrap().clone()
    }

    /// Build a provider whose every service is this fake
    pub fn provider(self: &Arc<Self>) -> Provider {
        Provider::new(&self.vendor_client())
    }

    pub fn vendor_client(self: &Arc<Self>) -> VendorClient {
        let slb: Arc<dyn SlbApi> = Arc::<Self>::clone(self);
        let key_pair: Arc<dyn KeyPairApi> = Arc::<Self>::clone(self);
        let private_dns: Arc<dyn PrivateDnsApi> = Arc::<Self>::clone(self);
        let traffic: Arc<dyn TrafficApi> = Arc::<Self>::clone(self);
        VendorClient::from_parts(slb, key_pair, private_dns, traffic)
    }

    fn record(&self, action: &str) -> ProviderResult<()> {
        self.calls.lock().unwrap().push(action.to_string());
        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(action)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_scripted<T: Clone>(script: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut script = script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }

    fn page<T: Clone>(items: &[T], page_num: Option<u32>, page_size: Option<u32>) -> ListResponse<T> {
        let size = page_size.unwrap_or(100) as usize;
        let start = (page_num.unwrap_or(1).saturating_sub(1) as usize) * size;
        ListResponse {
            total_count: items.len() as u64,
            data_set: items.iter().skip(start).take(size).cloned().collect(),
        }
    }

    fn mutate_backends(&self, action: &str, request: &BackendServersRequest) {
        self.backend_requests
            .lock()
            .unwrap()
            .push((action.to_string(), request.backend_servers.clone()));
        let mut backends = self.backends.lock().unwrap();
        for server in &request.backend_servers {
            let same = |b: &BackendServer| {
                b.instance_id == server.instance_id
                    && b.private_ip_address == server.private_ip_address
                    && b.port == server.port
            };
            match action {
                "RegisterBackend" => backends.push(server.clone()),
                "DeregisterBackend" => backends.retain(|b| !same(b)),
                _ => {
                    for b in backends.iter_mut().filter(|b| same(b)) {
                        b.weight = server.weight;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl SlbApi for FakeCloud {
    async fn create_load_balancer(
        &self,
        request: &CreateLoadBalancerRequest,
    ) -> ProviderResult<CreateLoadBalancerResponse> {
        self.record("CreateLoadBalancer")?;
        let id = "zlb-1".to_string();
        self.add_load_balancer(lb_info(&id, &request.load_balancer_name, LoadBalancerStatus::Creating));
        Ok(CreateLoadBalancerResponse {
            load_balancer_ids: vec![id],
            order_number: None,
        })
    }

    async fn describe_load_balancers(
        &self,
        request: &DescribeLoadBalancersRequest,
    ) -> ProviderResult<ListResponse<LoadBalancerInfo>> {
        self.record("DescribeLoadBalancers")?;
        let inventory = self.load_balancers.lock().unwrap().clone();
        if request.load_balancer_ids.is_empty() {
            return Ok(Self::page(&inventory, request.page_num, request.page_size));
        }

        let status = Self::next_scripted(&self.lb_statuses);
        let found: Vec<LoadBalancerInfo> = inventory
            .into_iter()
            .filter(|lb| request.load_balancer_ids.contains(&lb.load_balancer_id))
            .map(|mut lb| {
                if let Some(status) = &status {
                    lb.status = status.clone();
                }
                lb
            })
            .collect();
        Ok(ListResponse::new(found))
    }

    async fn modify_load_balancers_attribute(
        &self,
        request: &ModifyLoadBalancersAttributeRequest,
    ) -> ProviderResult<()> {
        self.record("ModifyLoadBalancersAttribute")?;
        for lb in self.load_balancers.lock().unwrap().iter_mut() {
            if request.load_balancer_ids.contains(&lb.load_balancer_id) {
                lb.load_balancer_name = request.load_balancer_name.clone();
            }
        }
        Ok(())
    }

    async fn modify_load_balancer_security_group(
        &self,
        request: &ModifyLoadBalancerSecurityGroupRequest,
    ) -> ProviderResult<()> {
        self.record("ModifyLoadBalancerSecurityGroup")?;
        for lb in self.load_balancers.lock().unwrap().iter_mut() {
            if lb.load_balancer_id == request.load_balancer_id {
                lb.security_group_id = Some(request.security_group_id.clone());
            }
        }
        Ok(())
    }

    async fn modify_load_balancer_resource_group(
        &self,
        request: &ModifyLoadBalancerResourceGroupRequest,
    ) -> ProviderResult<()> {
        self.record("ModifyLoadBalancerResourceGroup")?;
        for lb in self.load_balancers.lock().unwrap().iter_mut() {
            if lb.load_balancer_id == request.load_balancer_id {
                lb.resource_group_id = Some(request.resource_group_id.clone());
            }
        }
        Ok(())
    }

    async fn terminate_load_balancer(&self, request: &TerminateLoadBalancerRequest) -> ProviderResult<()> {
        self.record("TerminateLoadBalancer")?;
        let mut inventory = self.load_balancers.lock().unwrap();
        let before = inventory.len();
        inventory.retain(|lb| lb.load_balancer_id != request.load_balancer_id);
        if inventory.len() == before {
            return Err(not_found("load balancer"));
        }
        Ok(())
    }

    async fn create_listener(&self, request: &CreateListenerRequest) -> ProviderResult<CreateListenerResponse> {
        self.record("CreateListener")?;
        let mut listeners = self.listeners.lock().unwrap();
        let listener_id = format!("lsn-{}", listeners.len() + 1);
        listeners.push(ListenerInfo {
            listener_id: listener_id.clone(),
            listener_name: request.listener_name.clone(),
            protocol: request.protocol.clone(),
            port: request.port,
            scheduler: request.scheduler.clone(),
            health_check_enabled: request.health_check_enabled,
            health_check_type: request.health_check_type.clone(),
            health_check_port: request.health_check_port,
            status: Some("AVAILABLE".to_string()),
        });
        Ok(CreateListenerResponse { listener_id })
    }

    async fn describe_listeners(
        &self,
        request: &DescribeListenersRequest,
    ) -> ProviderResult<ListResponse<ListenerInfo>> {
        self.record("DescribeListeners")?;
        let found = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|l| request.listener_ids.is_empty() || request.listener_ids.contains(&l.listener_id))
            .cloned()
            .collect();
        Ok(ListResponse::new(found))
    }

    async fn modify_listener(&self, request: &ModifyListenerRequest) -> ProviderResult<()> {
        self.record("ModifyListener")?;
        for listener in self.listeners.lock().unwrap().iter_mut() {
            if listener.listener_id == request.listener_id {
                if let Some(name) = &request.listener_name {
                    listener.listener_name = name.clone();
                }
                if let Some(scheduler) = &request.scheduler {
                    listener.scheduler = scheduler.clone();
                }
            }
        }
        Ok(())
    }

    async fn delete_listener(&self, request: &DeleteListenerRequest) -> ProviderResult<()> {
        self.record("DeleteListener")?;
        self.listeners
            .lock()
            .unwrap()
            .retain(|l| l.listener_id != request.listener_id);
        Ok(())
    }

    async fn describe_backends(
        &self,
        _request: &DescribeBackendsRequest,
    ) -> ProviderResult<ListResponse<BackendServer>> {
        self.record("DescribeBackends")?;
        Ok(ListResponse::new(self.backends.lock().unwrap().clone()))
    }

    async fn register_backend(&self, request: &BackendServersRequest) -> ProviderResult<()> {
        self.record("RegisterBackend")?;
        self.mutate_backends("RegisterBackend", request);
        Ok(())
    }

    async fn deregister_backend(&self, request: &BackendServersRequest) -> ProviderResult<()> {
        self.record("DeregisterBackend")?;
        self.mutate_backends("DeregisterBackend", request);
        Ok(())
    }

    async fn modify_backends_weight(&self, request: &BackendServersRequest) -> ProviderResult<()> {
        self.record("ModifyBackendsWeight")?;
        self.mutate_backends("ModifyBackendsWeight", request);
        Ok(())
    }
}

#[async_trait]
impl KeyPairApi for FakeCloud {
    async fn create_key_pair(&self, request: &CreateKeyPairRequest) -> ProviderResult<CreateKeyPairResponse> {
        self.record("CreateKeyPair")?;
        let mut key_pairs = self.key_pairs.lock().unwrap();
        let key_id = format!("key-{}", key_pairs.len() + 1);
        key_pairs.insert(
            key_id.clone(),
            KeyPairInfo {
                key_id: key_id.clone(),
                key_name: request.key_name.clone(),
                public_key: request.public_key.clone(),
                key_description: request.key_description.clone(),
                create_time: Some("2026-01-01T00:00:00Z".to_string()),
            },
        );
        Ok(CreateKeyPairResponse { key_id })
    }

    async fn describe_key_pairs(
        &self,
        request: &DescribeKeyPairsRequest,
    ) -> ProviderResult<ListResponse<KeyPairInfo>> {
        self.record("DescribeKeyPairs")?;
        let matching: Vec<KeyPairInfo> = self
            .key_pairs
            .lock()
            .unwrap()
            .values()
            .filter(|key| request.key_ids.is_empty() || request.key_ids.contains(&key.key_id))
            .filter(|key| request.key_name.as_ref().is_none_or(|name| &key.key_name == name))
            .cloned()
            .collect();
        Ok(Self::page(&matching, request.page_num, request.page_size))
    }

    async fn modify_key_pair_attribute(&self, request: &ModifyKeyPairAttributeRequest) -> ProviderResult<()> {
        self.record("ModifyKeyPairAttribute")?;
        let mut key_pairs = self.key_pairs.lock().unwrap();
        let key = key_pairs
            .get_mut(&request.key_id)
            .ok_or_else(|| not_found("key pair"))?;
        key.key_description = Some(request.key_description.clone());
        Ok(())
    }

    async fn delete_key_pair(&self, request: &DeleteKeyPairRequest) -> ProviderResult<()> {
        self.record("DeleteKeyPair")?;
        self.key_pairs
            .lock()
            .unwrap()
            .remove(&request.key_id)
            .map(|_| ())
            .ok_or_else(|| not_found("key pair"))
    }
}

#[async_trait]
impl PrivateDnsApi for FakeCloud {
    async fn add_private_zone_record(
        &self,
        request: &AddPrivateZoneRecordRequest,
    ) -> ProviderResult<AddPrivateZoneRecordResponse> {
        self.record("AddPrivateZoneRecord")?;
        let mut records = self.records.lock().unwrap();
        let record_id = format!("rec-{}", records.len() + 1);
        records.push(PrivateZoneRecord {
            record_id: record_id.clone(),
            zone_id: request.zone_id.clone(),
            record_name: request.record_name.clone(),
            record_type: request.record_type.clone(),
            value: request.value.clone(),
            ttl: request.ttl,
            weight: request.weight,
            priority: request.priority,
            status: request.status.clone(),
            remark: request.remark.clone(),
        });
        Ok(AddPrivateZoneRecordResponse { record_id })
    }

    async fn describe_private_zone_records(
        &self,
        request: &DescribePrivateZoneRecordsRequest,
    ) -> ProviderResult<ListResponse<PrivateZoneRecord>> {
        self.record("DescribePrivateZoneRecords")?;
        let found = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.zone_id == request.zone_id)
            .filter(|r| request.record_ids.is_empty() || request.record_ids.contains(&r.record_id))
            .cloned()
            .collect();
        Ok(ListResponse::new(found))
    }

    async fn modify_private_zone_record(&self, request: &ModifyPrivateZoneRecordRequest) -> ProviderResult<()> {
        self.record("ModifyPrivateZoneRecord")?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.zone_id == request.zone_id && r.record_id == request.record_id)
            .ok_or_else(|| not_found("record"))?;
        record.value = request.value.clone();
        record.ttl = request.ttl;
        Ok(())
    }

    async fn delete_private_zone_record(&self, request: &DeletePrivateZoneRecordRequest) -> ProviderResult<()> {
        self.record("DeletePrivateZoneRecord")?;
        self.records
            .lock()
            .unwrap()
            .retain(|r| r.zone_id != request.zone_id || !request.record_ids.contains(&r.record_id));
        Ok(())
    }
}

#[async_trait]
impl TrafficApi for FakeCloud {
    async fn create_bandwidth_cluster(
        &self,
        request: &CreateBandwidthClusterRequest,
    ) -> ProviderResult<CreateBandwidthClusterResponse> {
        self.record("CreateBandwidthCluster")?;
        let id = format!("bwc-{}", self.clusters.lock().unwrap().len() + 1);
        self.add_cluster(&id, &request.bandwidth_cluster_name);
        Ok(CreateBandwidthClusterResponse {
            bandwidth_cluster_id: id,
        })
    }

    async fn describe_bandwidth_clusters(
        &self,
        request: &DescribeBandwidthClustersRequest,
    ) -> ProviderResult<ListResponse<BandwidthClusterInfo>> {
        self.record("DescribeBandwidthClusters")?;
        let found = self
            .clusters
            .lock()
            .unwrap()
            .values()
            .filter(|c| {
                request.bandwidth_cluster_ids.is_empty()
                    || request.bandwidth_cluster_ids.contains(&c.bandwidth_cluster_id)
            })
            .cloned()
            .collect();
        Ok(ListResponse::new(found))
    }

    async fn update_bandwidth_cluster_commit_bandwidth(
        &self,
        request: &UpdateBandwidthClusterCommitBandwidthRequest,
    ) -> ProviderResult<()> {
        self.record("UpdateBandwidthClusterCommitBandwidth")?;
        let mut clusters = self.clusters.lock().unwrap();
        let cluster = clusters
            .get_mut(&request.bandwidth_cluster_id)
            .ok_or_else(|| not_found("bandwidth cluster"))?;
        cluster.commit_bandwidth_mbps = request.commit_bandwidth_mbps;
        Ok(())
    }

    async fn describe_bandwidth_cluster_resources(
        &self,
        request: &DescribeBandwidthClusterResourcesRequest,
    ) -> ProviderResult<ListResponse<BandwidthClusterResource>> {
        self.record("DescribeBandwidthClusterResources")?;
        if !self.has_cluster(&request.bandwidth_cluster_id) {
            return Err(not_found("bandwidth cluster"));
        }
        let count = Self::next_scripted(&self.cluster_resource_counts).unwrap_or(0);
        Ok(ListResponse {
            total_count: count,
            data_set: (0..count)
                .map(|n| BandwidthClusterResource {
                    resource_id: format!("eip-{n}"),
                    resource_type: Some("EIP".to_string()),
                })
                .collect(),
        })
    }

    async fn delete_bandwidth_cluster(&self, request: &DeleteBandwidthClusterRequest) -> ProviderResult<()> {
        self.record("DeleteBandwidthCluster")?;
        self.clusters
            .lock()
            .unwrap()
            .remove(&request.bandwidth_cluster_id)
            .map(|_| ())
            .ok_or_else(|| not_found("bandwidth cluster"))
    }
}
