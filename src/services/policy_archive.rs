// services/policy_archive.rs - Policy Archive

use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::Policy;

/// Looks up the policy governing an agreed contract.
#[async_trait]
pub trait PolicyArchive: Send + Sync {
    async fn find_policy_for_contract(&self, contract_id: &str) -> Option<Policy>;
}

/// Archive backed by a concurrent map.
pub struct InMemoryPolicyArchive {
    policies: DashMap<String, Policy>,
}

impl InMemoryPolicyArchive {
    pub fn new() -> Self {
        Self {
            policies: DashMap::new(),
        }
    }

    pub fn register(&self, contract_id: &str, policy: Policy) {
        self.policies.insert(contract_id.to_string(), policy);
    }
}

impl Default for InMemoryPolicyArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyArchive for InMemoryPolicyArchive {
    async fn find_policy_for_contract(&self, contract_id: &str) -> Option<Policy> {
        self.policies.get(contract_id).map(|entry| entry.clone())
    }
}
