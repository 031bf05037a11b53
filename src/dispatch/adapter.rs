// dispatch/adapter.rs - Dispatch Adapter

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::envelope::ProtocolEnvelope;
use super::messages::{DispatchAck, ProtocolMessage};
use super::registry::DispatcherRegistry;
use crate::engine::{EngineError, ProtocolEntity, RemoteEntity, Role};
use crate::observability::record_dispatch;
use crate::persistence::EntityStore;

/// Builds the envelope for an entity's current step, pins the retry-stable
/// message id, and sends through the dispatcher registry.
pub struct DispatchAdapter<E: RemoteEntity> {
    registry: Arc<dyn DispatcherRegistry>,
    store: Arc<dyn EntityStore<E>>,
}

impl<E: RemoteEntity> DispatchAdapter<E> {
    pub fn new(registry: Arc<dyn DispatcherRegistry>, store: Arc<dyn EntityStore<E>>) -> Self {
        Self { registry, store }
    }

    /// Send the message produced by `build` on behalf of `entity`.
    ///
    /// If a message was already sent for the current state the same message
    /// id is reused, otherwise a fresh one is minted. The id is persisted on
    /// the entity before the send is attempted, so a crash between persist
    /// and response leaves the next trigger resending the identical message.
    pub async fn send<F>(&self, entity: &mut E, build: F) -> Result<DispatchAck, EngineError>
    where
        F: FnOnce(ProtocolEnvelope) -> ProtocolMessage,
    {
        let message_id = match entity.last_sent_protocol_message_id() {
            Some(id) => {
                debug!(id = entity.id(), message_id = id, "Reusing message id for retry");
                id.to_string()
            }
            None => uuid::Uuid::new_v4().to_string(),
        };
        entity.set_last_sent_protocol_message_id(Some(message_id.clone()));
        self.store.save(entity).await?;

        let message = build(self.envelope(entity, message_id));
        let kind = message.kind();

        let started = Instant::now();
        let result = self.registry.dispatch(message).await;
        record_dispatch(kind, result.is_ok(), started.elapsed());

        result.map_err(|source| EngineError::Dispatch {
            id: entity.id().to_string(),
            message: kind,
            source,
        })
    }

    fn envelope(&self, entity: &E, message_id: String) -> ProtocolEnvelope {
        let local_id = entity.id().to_string();
        let correlation = entity.correlation_id().map(str::to_string);

        // Address the counterparty by its own id once known.
        let process_id = correlation.clone().unwrap_or_else(|| local_id.clone());

        let (consumer_pid, provider_pid) = match entity.role() {
            Role::Consumer => (Some(local_id), correlation),
            Role::Provider => (correlation, Some(local_id)),
        };

        ProtocolEnvelope {
            message_id,
            counter_party_id: entity.counter_party_id().to_string(),
            counter_party_address: entity.counter_party_address().to_string(),
            protocol: entity.protocol().to_string(),
            process_id,
            consumer_pid,
            provider_pid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::messages::AgreementVerificationMessage;
    use crate::dispatch::registry::LoopbackDispatcher;
    use crate::engine::ProtocolEntity;
    use crate::model::{ContractOffer, Negotiation, Policy};
    use crate::persistence::InMemoryStore;

    fn consumer_negotiation() -> Negotiation {
        Negotiation::initiate_as_consumer(
            "provider-1",
            "https://provider.example/protocol",
            "dataspace-protocol-http",
            ContractOffer::new("offer-1", "asset-1", Policy::new()),
        )
    }

    fn verification(envelope: ProtocolEnvelope) -> ProtocolMessage {
        ProtocolMessage::AgreementVerification(AgreementVerificationMessage { envelope })
    }

    #[tokio::test]
    async fn test_message_id_minted_once_and_persisted_before_send() {
        let dispatcher = Arc::new(LoopbackDispatcher::new("P1"));
        let store = Arc::new(InMemoryStore::new());
        let adapter = DispatchAdapter::new(
            dispatcher.clone() as Arc<dyn DispatcherRegistry>,
            store.clone() as Arc<dyn EntityStore<Negotiation>>,
        );

        let mut negotiation = consumer_negotiation();
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        adapter.send(&mut negotiation, verification).await.unwrap();

        let message_id = negotiation
            .last_sent_protocol_message_id()
            .unwrap()
            .to_string();
        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(
            stored.last_sent_protocol_message_id(),
            Some(message_id.as_str())
        );
        assert_eq!(
            dispatcher.sent()[0].envelope().message_id,
            message_id
        );
    }

    #[tokio::test]
    async fn test_message_id_stable_across_retry() {
        let dispatcher = Arc::new(LoopbackDispatcher::new("P1"));
        let store = Arc::new(InMemoryStore::new());
        let adapter = DispatchAdapter::new(
            dispatcher.clone() as Arc<dyn DispatcherRegistry>,
            store.clone() as Arc<dyn EntityStore<Negotiation>>,
        );

        let mut negotiation = consumer_negotiation();
        store.save(&negotiation).await.unwrap();

        dispatcher.fail_next("timeout");
        let first = adapter.send(&mut negotiation, verification).await;
        assert!(matches!(first, Err(EngineError::Dispatch { .. })));
        let pinned = negotiation
            .last_sent_protocol_message_id()
            .unwrap()
            .to_string();

        adapter.send(&mut negotiation, verification).await.unwrap();
        assert_eq!(dispatcher.sent()[0].envelope().message_id, pinned);
    }

    #[tokio::test]
    async fn test_envelope_pids_for_consumer_without_correlation() {
        let dispatcher = Arc::new(LoopbackDispatcher::new("P1"));
        let store = Arc::new(InMemoryStore::new());
        let adapter = DispatchAdapter::new(
            dispatcher.clone() as Arc<dyn DispatcherRegistry>,
            store.clone() as Arc<dyn EntityStore<Negotiation>>,
        );

        let mut negotiation = consumer_negotiation();
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        adapter.send(&mut negotiation, verification).await.unwrap();

        let envelope = dispatcher.sent()[0].envelope().clone();
        assert_eq!(envelope.consumer_pid.as_deref(), Some(id.as_str()));
        assert_eq!(envelope.provider_pid, None);
        // No correlation id yet: the counterparty is addressed by our id.
        assert_eq!(envelope.process_id, id);
    }

    #[tokio::test]
    async fn test_envelope_uses_correlation_id_once_known() {
        let dispatcher = Arc::new(LoopbackDispatcher::new("P1"));
        let store = Arc::new(InMemoryStore::new());
        let adapter = DispatchAdapter::new(
            dispatcher.clone() as Arc<dyn DispatcherRegistry>,
            store.clone() as Arc<dyn EntityStore<Negotiation>>,
        );

        let mut negotiation = consumer_negotiation();
        negotiation.set_correlation_id("P-PID-7".into());
        store.save(&negotiation).await.unwrap();

        adapter.send(&mut negotiation, verification).await.unwrap();

        let envelope = dispatcher.sent()[0].envelope().clone();
        assert_eq!(envelope.process_id, "P-PID-7");
        assert_eq!(envelope.provider_pid.as_deref(), Some("P-PID-7"));
    }
}
