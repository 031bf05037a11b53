// services/vault.rs - Secret Vault

use dashmap::DashMap;

/// Resolves vault-held secrets referenced by data addresses.
pub trait Vault: Send + Sync {
    fn resolve_secret(&self, key: &str) -> Option<String>;
}

/// Vault backed by a concurrent map. Test/demo use only.
pub struct InMemoryVault {
    secrets: DashMap<String, String>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self {
            secrets: DashMap::new(),
        }
    }

    pub fn store(&self, key: &str, secret: &str) {
        self.secrets.insert(key.to_string(), secret.to_string());
    }
}

impl Default for InMemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl Vault for InMemoryVault {
    fn resolve_secret(&self, key: &str) -> Option<String> {
        self.secrets.get(key).map(|entry| entry.clone())
    }
}
