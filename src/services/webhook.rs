// services/webhook.rs - Protocol Webhook Registry

use dashmap::DashMap;

/// Resolves the local callback endpoint for a protocol identifier.
///
/// Outbound requests carry this address so the counterparty knows where to
/// answer; a protocol without a registered webhook cannot be spoken.
pub trait WebhookRegistry: Send + Sync {
    fn resolve(&self, protocol: &str) -> Option<String>;
}

/// Registry backed by a concurrent map.
pub struct InMemoryWebhookRegistry {
    entries: DashMap<String, String>,
}

impl InMemoryWebhookRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn register(&self, protocol: &str, address: &str) {
        self.entries
            .insert(protocol.to_string(), address.to_string());
    }
}

impl Default for InMemoryWebhookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookRegistry for InMemoryWebhookRegistry {
    fn resolve(&self, protocol: &str) -> Option<String> {
        self.entries.get(protocol).map(|entry| entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let registry = InMemoryWebhookRegistry::new();
        registry.register("dataspace-protocol-http", "https://local.example/protocol");

        assert_eq!(
            registry.resolve("dataspace-protocol-http").as_deref(),
            Some("https://local.example/protocol")
        );
        assert_eq!(registry.resolve("unknown"), None);
    }
}
