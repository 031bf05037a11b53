// services/resolver.rs - Data Address Resolver

use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::DataAddress;

/// Provider-side lookup of the source address for an asset.
#[async_trait]
pub trait DataAddressResolver: Send + Sync {
    async fn resolve_for_asset(&self, asset_id: &str) -> Option<DataAddress>;
}

/// Resolver backed by a concurrent map.
pub struct InMemoryAddressResolver {
    addresses: DashMap<String, DataAddress>,
}

impl InMemoryAddressResolver {
    pub fn new() -> Self {
        Self {
            addresses: DashMap::new(),
        }
    }

    pub fn register(&self, asset_id: &str, address: DataAddress) {
        self.addresses.insert(asset_id.to_string(), address);
    }
}

impl Default for InMemoryAddressResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataAddressResolver for InMemoryAddressResolver {
    async fn resolve_for_asset(&self, asset_id: &str) -> Option<DataAddress> {
        self.addresses.get(asset_id).map(|entry| entry.clone())
    }
}
