//! # Vendor Client
//!
//! Typed access to the Zenlayer Cloud API, one sub-client per service.
//!
//! All sub-clients share one [`rest::ApiClient`] (and its connection pool) and
//! are built together by [`VendorClient::new`]. Lifecycle shells only see the
//! `*Api` traits, so tests can substitute in-memory fakes.

pub mod keypair;
pub mod pvtdns;
pub mod rest;
pub mod slb;
pub mod traffic;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::engine::error::ProviderResult;
use crate::engine::paginate::Page;

pub use keypair::{KeyPairApi, KeyPairClient};
pub use pvtdns::{PrivateDnsApi, PrivateDnsClient};
pub use rest::ApiClient;
pub use slb::{SlbApi, SlbClient};
pub use traffic::{TrafficApi, TrafficClient};

/// Paginated list payload returned by `Describe*` actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default = "Vec::new")]
    pub data_set: Vec<T>,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self {
            total_count: 0,
            data_set: Vec::new(),
        }
    }
}

impl<T> ListResponse<T> {
    #[must_use]
    pub fn new(data_set: Vec<T>) -> Self {
        Self {
            total_count: data_set.len() as u64,
            data_set,
        }
    }
}

impl<T> From<ListResponse<T>> for Page<T> {
    fn from(response: ListResponse<T>) -> Self {
        Page {
            items: response.data_set,
            total_count: response.total_count,
        }
    }
}

/// Every service client, built eagerly
#[derive(Clone)]
pub struct VendorClient {
    pub slb: Arc<dyn SlbApi>,
    pub key_pair: Arc<dyn KeyPairApi>,
    pub private_dns: Arc<dyn PrivateDnsApi>,
    pub traffic: Arc<dyn TrafficApi>,
}

impl std::fmt::Debug for VendorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorClient").finish_non_exhaustive()
    }
}

impl VendorClient {
    /// Build every sub-client over one shared transport
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let api = Arc::new(ApiClient::new(config)?);
        Ok(Self {
            slb: Arc::new(SlbClient::new(Arc::clone(&api))),
            key_pair: Arc::new(KeyPairClient::new(Arc::clone(&api))),
            private_dns: Arc::new(PrivateDnsClient::new(Arc::clone(&api))),
            traffic: Arc::new(TrafficClient::new(api)),
        })
    }

    /// Assemble a client from existing service implementations
    #[must_use]
    pub fn from_parts(
        slb: Arc<dyn SlbApi>,
        key_pair: Arc<dyn KeyPairApi>,
        private_dns: Arc<dyn PrivateDnsApi>,
        traffic: Arc<dyn TrafficApi>,
    ) -> Self {
        Self {
            slb,
            key_pair,
            private_dns,
            traffic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_response_defaults_missing_fields() {
        let list: ListResponse<String> = serde_json::from_value(json!({})).unwrap();
        assert_eq!(list.total_count, 0);
        assert!(list.data_set.is_empty());

        let page: Page<String> = ListResponse::new(vec!["a".to_string()]).into();
        assert_eq!(page.total_count, 1);
    }
}
