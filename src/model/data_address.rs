// model/data_address.rs - Data Addresses

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Property key under which a vault-resolved secret is inlined before a
/// destination travels in a transfer request.
pub const SECRET_PROPERTY: &str = "secret";

/// Location of data at rest or in motion.
///
/// On the consumer side this describes the requested sink; on the provider
/// side the resolved source. The `key_name` indirection lets a destination
/// reference a vault-held credential instead of carrying it inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAddress {
    /// Address kind, e.g. "HttpData" or "AmazonS3".
    pub kind: String,

    /// Optional vault key holding the access credential for this address.
    pub key_name: Option<String>,

    /// Kind-specific properties (endpoint, bucket, path, ...).
    pub properties: HashMap<String, String>,
}

impl DataAddress {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            key_name: None,
            properties: HashMap::new(),
        }
    }

    pub fn with_key_name(mut self, key_name: &str) -> Self {
        self.key_name = Some(key_name.to_string());
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
