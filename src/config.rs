// config.rs - Connector Configuration

//! Connector settings, loadable from a file plus `DSP_`-prefixed environment
//! overrides (e.g. `DSP_PARTICIPANT_ID=acme`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// This connector's participant identifier in the dataspace.
    pub participant_id: String,

    /// Protocol identifier spoken with counterparties.
    pub protocol: String,

    /// Callback endpoint advertised to counterparties.
    pub callback_address: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format (pretty, compact, json).
    pub log_format: String,

    /// Expose the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics listen address.
    pub metrics_addr: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            participant_id: "connector-local".into(),
            protocol: "dataspace-protocol-http".into(),
            callback_address: "http://localhost:8282/protocol".into(),
            log_level: "info".into(),
            log_format: "pretty".into(),
            metrics_enabled: false,
            metrics_addr: "0.0.0.0:9090".into(),
        }
    }
}

impl ConnectorConfig {
    /// Load configuration, layering `path` (if given) under `DSP_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(Environment::with_prefix("DSP").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::default();
        assert_eq!(config.protocol, "dataspace-protocol-http");
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = ConnectorConfig::load(None).unwrap();
        assert_eq!(config.participant_id, "connector-local");
    }
}
