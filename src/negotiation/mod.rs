// negotiation/mod.rs - Contract Negotiation Orchestrator

//! Drives [`Negotiation`] entities through
//! offer/request/agreement/verification/finalization.
//!
//! States without a handler (OFFERED, AGREED, ...) are waiting states: the
//! counterparty's own connector, or an external initiation/acceptance call,
//! moves the entity onward. Advance-only states exist so the same polling
//! trigger can push the entity one more hop without protocol knowledge.

mod agreement;
mod handlers;
mod observable;

pub use agreement::synthesize_agreement;
pub use handlers::NegotiationServices;
pub use observable::{NegotiationListener, NegotiationObservable, NegotiationTransition};

use std::sync::Arc;

use crate::dispatch::{DispatchAdapter, DispatcherRegistry};
use crate::engine::{
    EngineError, HandlerTable, NeverPending, PendingGuard, Role, RoleBinding, RoleMismatchPolicy,
    StateMachineEngine, TransitionExecutor,
};
use crate::model::{Negotiation, NegotiationState};
use crate::persistence::{EntityStore, NoopTransactionContext, TransactionContext};
use crate::services::WebhookRegistry;

const ENTITY_KIND: &str = "negotiation";

/// The negotiation orchestrator: one [`handle`](Self::handle) call drives one
/// entity one step.
pub struct NegotiationOrchestrator {
    engine: StateMachineEngine<NegotiationServices, Negotiation>,
}

impl NegotiationOrchestrator {
    pub fn builder(
        participant_id: &str,
        store: Arc<dyn EntityStore<Negotiation>>,
        dispatcher: Arc<dyn DispatcherRegistry>,
        webhooks: Arc<dyn WebhookRegistry>,
    ) -> NegotiationOrchestratorBuilder {
        NegotiationOrchestratorBuilder {
            participant_id: participant_id.to_string(),
            store,
            dispatcher,
            webhooks,
            transactions: Arc::new(NoopTransactionContext),
            pending: Arc::new(NeverPending),
            observable: NegotiationObservable::new(),
        }
    }

    /// Drive negotiation `id` if it still is in `expected` state. Safe to
    /// call repeatedly and concurrently.
    pub async fn handle(&self, id: &str, expected: NegotiationState) -> Result<(), EngineError> {
        self.engine.handle(id, expected).await
    }
}

pub struct NegotiationOrchestratorBuilder {
    participant_id: String,
    store: Arc<dyn EntityStore<Negotiation>>,
    dispatcher: Arc<dyn DispatcherRegistry>,
    webhooks: Arc<dyn WebhookRegistry>,
    transactions: Arc<dyn TransactionContext>,
    pending: Arc<dyn PendingGuard<Negotiation>>,
    observable: NegotiationObservable,
}

impl NegotiationOrchestratorBuilder {
    pub fn with_transaction_context(mut self, transactions: Arc<dyn TransactionContext>) -> Self {
        self.transactions = transactions;
        self
    }

    pub fn with_pending_guard(mut self, pending: Arc<dyn PendingGuard<Negotiation>>) -> Self {
        self.pending = pending;
        self
    }

    pub fn with_listener(self, listener: Arc<dyn NegotiationListener>) -> Self {
        self.observable.register(listener);
        self
    }

    pub fn build(self) -> NegotiationOrchestrator {
        let observable = Arc::new(self.observable);
        let executor =
            TransitionExecutor::new(ENTITY_KIND, self.store.clone(), observable);
        let adapter = DispatchAdapter::new(self.dispatcher, self.store.clone());
        let services = Arc::new(NegotiationServices::new(
            self.participant_id,
            executor,
            adapter,
            self.webhooks,
        ));

        NegotiationOrchestrator {
            engine: StateMachineEngine::new(
                ENTITY_KIND,
                self.store,
                self.transactions,
                self.pending,
                // Negotiation state codes are role-partitioned; a mismatch is
                // a stale registration and skips.
                RoleMismatchPolicy::Skip,
                handler_table(),
                services,
            ),
        }
    }
}

/// State -> (handler, required role), built once at construction.
fn handler_table() -> HandlerTable<NegotiationServices, Negotiation> {
    use NegotiationState::*;

    HandlerTable::new()
        .bind(Initial, RoleBinding::Only(Role::Consumer), |s: Arc<NegotiationServices>, n| {
            Box::pin(async move { s.process_initial(n).await })
        })
        .bind(Requesting, RoleBinding::Only(Role::Consumer), |s, n| {
            Box::pin(async move { s.process_requesting(n).await })
        })
        .bind(Requested, RoleBinding::Only(Role::Provider), |s, n| {
            Box::pin(async move { s.process_requested(n).await })
        })
        .bind(Offering, RoleBinding::Only(Role::Provider), |s, n| {
            Box::pin(async move { s.process_offering(n).await })
        })
        .bind(Accepting, RoleBinding::Only(Role::Consumer), |s, n| {
            Box::pin(async move { s.process_accepting(n).await })
        })
        .bind(Accepted, RoleBinding::Only(Role::Provider), |s, n| {
            Box::pin(async move { s.process_accepted(n).await })
        })
        .bind(Agreeing, RoleBinding::Only(Role::Provider), |s, n| {
            Box::pin(async move { s.process_agreeing(n).await })
        })
        .bind(Verifying, RoleBinding::Only(Role::Consumer), |s, n| {
            Box::pin(async move { s.process_verifying(n).await })
        })
        .bind(Verified, RoleBinding::Only(Role::Provider), |s, n| {
            Box::pin(async move { s.process_verified(n).await })
        })
        .bind(Finalizing, RoleBinding::Only(Role::Provider), |s, n| {
            Box::pin(async move { s.process_finalizing(n).await })
        })
        .bind(Terminating, RoleBinding::Any, |s, n| {
            Box::pin(async move { s.process_terminating(n).await })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{LoopbackDispatcher, ProtocolMessage};
    use crate::engine::{ProtocolEntity, RemoteEntity};
    use crate::model::{ContractOffer, Policy};
    use crate::persistence::InMemoryStore;
    use crate::services::InMemoryWebhookRegistry;

    const PROTOCOL: &str = "dataspace-protocol-http";

    struct Fixture {
        orchestrator: NegotiationOrchestrator,
        store: Arc<InMemoryStore<Negotiation>>,
        dispatcher: Arc<LoopbackDispatcher>,
    }

    fn fixture(register_webhook: bool) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let dispatcher = Arc::new(LoopbackDispatcher::new("P1"));
        let webhooks = Arc::new(InMemoryWebhookRegistry::new());
        if register_webhook {
            webhooks.register(PROTOCOL, "https://consumer.example/protocol");
        }

        let orchestrator = NegotiationOrchestrator::builder(
            "participant-local",
            store.clone(),
            dispatcher.clone(),
            webhooks,
        )
        .build();

        Fixture {
            orchestrator,
            store,
            dispatcher,
        }
    }

    fn offer() -> ContractOffer {
        ContractOffer::new("offer-1", "asset-1", Policy::new().with_target("asset-1"))
    }

    async fn seed(fixture: &Fixture, negotiation: &Negotiation) -> String {
        fixture.store.save(negotiation).await.unwrap();
        negotiation.id().to_string()
    }

    async fn stored(fixture: &Fixture, id: &str) -> Negotiation {
        fixture.store.find_by_id(id).await.unwrap().unwrap()
    }

    /// Force a waiting-state hop the way the incoming-message layer would.
    async fn poke(fixture: &Fixture, id: &str, state: NegotiationState) {
        let mut entity = stored(fixture, id).await;
        entity.transition_to(state);
        fixture.store.save(&entity).await.unwrap();
    }

    #[tokio::test]
    async fn test_consumer_happy_path_to_requested() {
        let fixture = fixture(true);
        let negotiation = Negotiation::initiate_as_consumer(
            "provider-1",
            "https://provider.example/protocol",
            PROTOCOL,
            offer(),
        );
        let id = seed(&fixture, &negotiation).await;

        fixture
            .orchestrator
            .handle(&id, NegotiationState::Initial)
            .await
            .unwrap();
        assert_eq!(
            stored(&fixture, &id).await.state(),
            NegotiationState::Requesting
        );

        fixture
            .orchestrator
            .handle(&id, NegotiationState::Requesting)
            .await
            .unwrap();

        let after = stored(&fixture, &id).await;
        assert_eq!(after.state(), NegotiationState::Requested);
        assert_eq!(after.correlation_id(), Some("P1"));

        let sent = fixture.dispatcher.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], ProtocolMessage::ContractRequest(_)));
    }

    #[tokio::test]
    async fn test_counter_offer_variant_after_second_offer() {
        let fixture = fixture(true);
        let mut negotiation = Negotiation::initiate_as_consumer(
            "provider-1",
            "https://provider.example/protocol",
            PROTOCOL,
            offer(),
        );
        negotiation.add_offer(ContractOffer::new("offer-2", "asset-1", Policy::new()));
        negotiation.transition_to(NegotiationState::Requesting);
        let id = seed(&fixture, &negotiation).await;

        fixture
            .orchestrator
            .handle(&id, NegotiationState::Requesting)
            .await
            .unwrap();

        match &fixture.dispatcher.sent()[0] {
            ProtocolMessage::ContractRequest(message) => {
                assert_eq!(message.kind, crate::dispatch::ContractRequestKind::CounterOffer);
                assert_eq!(message.offer.id, "offer-2");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_webhook_terminates_and_fails() {
        let fixture = fixture(false);
        let mut negotiation = Negotiation::initiate_as_consumer(
            "provider-1",
            "https://provider.example/protocol",
            PROTOCOL,
            offer(),
        );
        negotiation.transition_to(NegotiationState::Requesting);
        let id = seed(&fixture, &negotiation).await;

        let result = fixture
            .orchestrator
            .handle(&id, NegotiationState::Requesting)
            .await;
        assert!(matches!(
            result,
            Err(EngineError::PrerequisiteMissing { .. })
        ));

        let after = stored(&fixture, &id).await;
        assert_eq!(after.state(), NegotiationState::Terminated);
        assert!(after.error_detail().unwrap().contains(PROTOCOL));
        assert_eq!(fixture.dispatcher.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_idempotent_retrigger_after_advancing() {
        let fixture = fixture(true);
        let negotiation = Negotiation::initiate_as_consumer(
            "provider-1",
            "https://provider.example/protocol",
            PROTOCOL,
            offer(),
        );
        let id = seed(&fixture, &negotiation).await;

        fixture
            .orchestrator
            .handle(&id, NegotiationState::Initial)
            .await
            .unwrap();
        let first = stored(&fixture, &id).await;

        // Same trigger again: the entity advanced past INITIAL, so nothing
        // may change.
        fixture
            .orchestrator
            .handle(&id, NegotiationState::Initial)
            .await
            .unwrap();
        let second = stored(&fixture, &id).await;

        assert_eq!(first.state(), second.state());
        assert_eq!(first.updated_at(), second.updated_at());
    }

    #[tokio::test]
    async fn test_dispatch_failure_keeps_state_and_message_id() {
        let fixture = fixture(true);
        let mut negotiation = Negotiation::initiate_as_consumer(
            "provider-1",
            "https://provider.example/protocol",
            PROTOCOL,
            offer(),
        );
        negotiation.transition_to(NegotiationState::Requesting);
        let id = seed(&fixture, &negotiation).await;

        fixture.dispatcher.fail_next("connection reset");
        let result = fixture
            .orchestrator
            .handle(&id, NegotiationState::Requesting)
            .await;
        assert!(matches!(result, Err(EngineError::Dispatch { .. })));

        let parked = stored(&fixture, &id).await;
        assert_eq!(parked.state(), NegotiationState::Requesting);
        let pinned = parked
            .last_sent_protocol_message_id()
            .unwrap()
            .to_string();

        // Retry succeeds and reuses the pinned message id.
        fixture
            .orchestrator
            .handle(&id, NegotiationState::Requesting)
            .await
            .unwrap();
        assert_eq!(
            fixture.dispatcher.sent()[0].envelope().message_id,
            pinned
        );
        assert_eq!(
            stored(&fixture, &id).await.state(),
            NegotiationState::Requested
        );
    }

    #[tokio::test]
    async fn test_provider_agreeing_synthesizes_and_stores_agreement() {
        let fixture = fixture(true);
        let negotiation = Negotiation::initiate_as_provider(
            "consumer-1",
            "https://consumer.example/protocol",
            PROTOCOL,
            offer(),
            "C-PID-1",
        );
        let id = seed(&fixture, &negotiation).await;

        // REQUESTED is a provider advance into AGREEING.
        fixture
            .orchestrator
            .handle(&id, NegotiationState::Requested)
            .await
            .unwrap();
        assert_eq!(
            stored(&fixture, &id).await.state(),
            NegotiationState::Agreeing
        );

        fixture
            .orchestrator
            .handle(&id, NegotiationState::Agreeing)
            .await
            .unwrap();

        let after = stored(&fixture, &id).await;
        assert_eq!(after.state(), NegotiationState::Agreed);
        let agreement = after.agreement().unwrap();
        assert_eq!(agreement.provider_id, "participant-local");
        assert_eq!(agreement.consumer_id, "consumer-1");
        assert_eq!(agreement.asset_id, "asset-1");

        match &fixture.dispatcher.sent()[0] {
            ProtocolMessage::ContractAgreement(message) => {
                assert_eq!(message.agreement.id, agreement.id);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_finishes_through_finalized() {
        let fixture = fixture(true);
        let negotiation = Negotiation::initiate_as_provider(
            "consumer-1",
            "https://consumer.example/protocol",
            PROTOCOL,
            offer(),
            "C-PID-1",
        );
        let id = seed(&fixture, &negotiation).await;

        // The consumer's verification arrives out-of-band.
        poke(&fixture, &id, NegotiationState::Verified).await;

        fixture
            .orchestrator
            .handle(&id, NegotiationState::Verified)
            .await
            .unwrap();
        fixture
            .orchestrator
            .handle(&id, NegotiationState::Finalizing)
            .await
            .unwrap();

        let after = stored(&fixture, &id).await;
        assert_eq!(after.state(), NegotiationState::Finalized);

        // Terminal absorption: more triggers change nothing.
        fixture
            .orchestrator
            .handle(&id, NegotiationState::Finalized)
            .await
            .unwrap();
        assert_eq!(
            stored(&fixture, &id).await.updated_at(),
            after.updated_at()
        );
    }

    #[tokio::test]
    async fn test_terminating_sends_reason_from_error_detail() {
        let fixture = fixture(true);
        let mut negotiation = Negotiation::initiate_as_consumer(
            "provider-1",
            "https://provider.example/protocol",
            PROTOCOL,
            offer(),
        );
        negotiation.set_error_detail(Some("policy rejected".into()));
        negotiation.transition_to(NegotiationState::Terminating);
        let id = seed(&fixture, &negotiation).await;

        fixture
            .orchestrator
            .handle(&id, NegotiationState::Terminating)
            .await
            .unwrap();

        match &fixture.dispatcher.sent()[0] {
            ProtocolMessage::NegotiationTermination(message) => {
                assert_eq!(message.reason.as_deref(), Some("policy rejected"));
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(
            stored(&fixture, &id).await.state(),
            NegotiationState::Terminated
        );
    }

    #[tokio::test]
    async fn test_role_gating_skips_silently() {
        let fixture = fixture(true);
        // A provider entity triggered in a consumer-only state.
        let mut negotiation = Negotiation::initiate_as_provider(
            "consumer-1",
            "https://consumer.example/protocol",
            PROTOCOL,
            offer(),
            "C-PID-1",
        );
        negotiation.transition_to(NegotiationState::Accepting);
        let id = seed(&fixture, &negotiation).await;

        fixture
            .orchestrator
            .handle(&id, NegotiationState::Accepting)
            .await
            .unwrap();

        assert_eq!(
            stored(&fixture, &id).await.state(),
            NegotiationState::Accepting
        );
        assert_eq!(fixture.dispatcher.sent_count(), 0);
    }
}
