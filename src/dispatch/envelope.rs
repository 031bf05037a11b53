// dispatch/envelope.rs - Protocol Message Envelope

use serde::{Deserialize, Serialize};

/// Universal fields every outbound protocol message carries.
///
/// `process_id` is how the counterparty is addressed: its own id for the
/// exchange once known (the correlation id), the local id before that.
/// `consumer_pid`/`provider_pid` label the two process ids by role; the
/// counterparty's side stays unset until its first acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolEnvelope {
    /// Message id, stable across retries of the same state step so the
    /// receiver can deduplicate.
    pub message_id: String,

    pub counter_party_id: String,
    pub counter_party_address: String,

    /// Protocol identifier, e.g. "dataspace-protocol-http".
    pub protocol: String,

    /// Id used when addressing the counterparty.
    pub process_id: String,

    pub consumer_pid: Option<String>,
    pub provider_pid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serde_round_trip() {
        let envelope = ProtocolEnvelope {
            message_id: "msg-1".into(),
            counter_party_id: "provider-1".into(),
            counter_party_address: "https://provider.example/protocol".into(),
            protocol: "dataspace-protocol-http".into(),
            process_id: "local-1".into(),
            consumer_pid: Some("local-1".into()),
            provider_pid: None,
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let back: ProtocolEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
