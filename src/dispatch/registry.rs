// dispatch/registry.rs - Dispatcher Registry

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use super::messages::{DispatchAck, ProtocolMessage};

/// Dispatch failures. All transport and protocol-level problems surface
/// through this type; nothing is thrown past the orchestrator.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("counterparty rejected the message: {0}")]
    Rejected(String),

    #[error("no dispatcher registered for protocol '{0}'")]
    NoDispatcher(String),
}

/// Sends a protocol message to the remote party and resolves with its typed
/// acknowledgement or a failure. The blocking round-trip and any timeout
/// policy live behind this seam.
#[async_trait]
pub trait DispatcherRegistry: Send + Sync {
    async fn dispatch(&self, message: ProtocolMessage) -> Result<DispatchAck, DispatchError>;
}

/// In-process dispatcher that acknowledges every message with a fixed remote
/// pid. Stands in for the transport in tests and the demo; records what it
/// sent and can be armed to fail the next dispatch.
pub struct LoopbackDispatcher {
    remote_pid: String,
    sent: Mutex<Vec<ProtocolMessage>>,
    fail_next: Mutex<Option<String>>,
}

impl LoopbackDispatcher {
    pub fn new(remote_pid: &str) -> Self {
        Self {
            remote_pid: remote_pid.to_string(),
            sent: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    /// Fail the next dispatch with a transport error carrying `detail`.
    pub fn fail_next(&self, detail: &str) {
        *self.fail_next.lock() = Some(detail.to_string());
    }

    /// Everything dispatched so far, in order.
    pub fn sent(&self) -> Vec<ProtocolMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl DispatcherRegistry for LoopbackDispatcher {
    async fn dispatch(&self, message: ProtocolMessage) -> Result<DispatchAck, DispatchError> {
        if let Some(detail) = self.fail_next.lock().take() {
            return Err(DispatchError::Transport(detail));
        }

        debug!(
            kind = message.kind(),
            message_id = %message.envelope().message_id,
            "Loopback dispatch"
        );

        // The remote side would answer with its own pid for the exchange;
        // report the fixed one on whichever side the sender left blank.
        let envelope = message.envelope();
        let ack = DispatchAck {
            consumer_pid: envelope
                .consumer_pid
                .clone()
                .or_else(|| Some(self.remote_pid.clone())),
            provider_pid: envelope
                .provider_pid
                .clone()
                .or_else(|| Some(self.remote_pid.clone())),
        };

        self.sent.lock().push(message);
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::envelope::ProtocolEnvelope;
    use crate::dispatch::messages::TransferCompletionMessage;

    fn message() -> ProtocolMessage {
        ProtocolMessage::TransferCompletion(TransferCompletionMessage {
            envelope: ProtocolEnvelope {
                message_id: "msg-1".into(),
                counter_party_id: "provider-1".into(),
                counter_party_address: "https://provider.example/protocol".into(),
                protocol: "dataspace-protocol-http".into(),
                process_id: "local-1".into(),
                consumer_pid: Some("local-1".into()),
                provider_pid: None,
            },
        })
    }

    #[tokio::test]
    async fn test_ack_fills_missing_pid() {
        let dispatcher = LoopbackDispatcher::new("P1");
        let ack = dispatcher.dispatch(message()).await.unwrap();
        assert_eq!(ack.provider_pid.as_deref(), Some("P1"));
        assert_eq!(ack.consumer_pid.as_deref(), Some("local-1"));
        assert_eq!(dispatcher.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_armed_failure_records_nothing() {
        let dispatcher = LoopbackDispatcher::new("P1");
        dispatcher.fail_next("connection refused");

        let result = dispatcher.dispatch(message()).await;
        assert!(matches!(result, Err(DispatchError::Transport(_))));
        assert_eq!(dispatcher.sent_count(), 0);

        // The failure is one-shot.
        assert!(dispatcher.dispatch(message()).await.is_ok());
    }
}
