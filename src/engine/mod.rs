// engine/mod.rs - State Machine Engine

//! Generic state-machine orchestration skeleton shared by the negotiation
//! and transfer orchestrators.
//!
//! One invocation of [`StateMachineEngine::handle`] runs the guard chain and,
//! if every guard passes, the registered transition handler, all inside a
//! single transactional scope. The caller may re-invoke the same
//! `(id, state)` pair arbitrarily often; only the invocation that finds the
//! entity still in exactly that state performs work.

mod entity;
mod error;
mod executor;
mod handler;
mod pending;

pub use entity::{ProtocolEntity, RemoteEntity, Role, StateCode};
pub use error::EngineError;
pub use executor::{TransitionEvent, TransitionExecutor, TransitionObservable};
pub use handler::{HandlerEntry, HandlerFn, HandlerTable, RoleBinding};
pub use pending::{NeverPending, PendingGuard};

use std::sync::Arc;

use tracing::debug;

use crate::observability::record_guard_skip;
use crate::persistence::{EntityStore, Transaction, TransactionContext};

/// What a role-mismatched trigger does.
///
/// Negotiation states are role-partitioned in practice, so a mismatch there
/// is a stale registration and skips; transfer states are mostly `any`-role,
/// so a mismatch there is a wiring bug and fails hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleMismatchPolicy {
    Skip,
    Fail,
}

/// Why an invocation performed no work. Never surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Entity already reached an absorbing state.
    AlreadyFinal,
    /// Persisted state differs from the expected state: a stale or duplicate
    /// trigger lost the race.
    Stale,
    /// The expected state has no registered handler; only the counterparty
    /// acts in it.
    NoHandler,
    /// Handler's required role does not match the entity.
    RoleMismatch,
    /// An external prerequisite has not resolved yet.
    Pending,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyFinal => "already_final",
            SkipReason::Stale => "stale",
            SkipReason::NoHandler => "no_handler",
            SkipReason::RoleMismatch => "role_mismatch",
            SkipReason::Pending => "pending",
        }
    }
}

/// Outcome of one guard-chain evaluation.
enum Evaluation {
    Processed,
    Skipped(SkipReason),
}

/// The shared per-entity transition algorithm, parameterized over the entity
/// type `E` and the orchestrator's service context `C` the handlers run
/// against.
pub struct StateMachineEngine<C, E: ProtocolEntity> {
    entity_kind: &'static str,
    store: Arc<dyn EntityStore<E>>,
    transactions: Arc<dyn TransactionContext>,
    pending: Arc<dyn PendingGuard<E>>,
    role_mismatch: RoleMismatchPolicy,
    handlers: HandlerTable<C, E>,
    context: Arc<C>,
}

impl<C, E> StateMachineEngine<C, E>
where
    C: Send + Sync + 'static,
    E: ProtocolEntity,
{
    pub fn new(
        entity_kind: &'static str,
        store: Arc<dyn EntityStore<E>>,
        transactions: Arc<dyn TransactionContext>,
        pending: Arc<dyn PendingGuard<E>>,
        role_mismatch: RoleMismatchPolicy,
        handlers: HandlerTable<C, E>,
        context: Arc<C>,
    ) -> Self {
        Self {
            entity_kind,
            store,
            transactions,
            pending,
            role_mismatch,
            handlers,
            context,
        }
    }

    /// Drive the entity one step, if it is still in `expected` state.
    ///
    /// Safe under at-least-once, concurrent, duplicate triggering: every
    /// skip returns `Ok(())`.
    pub async fn handle(&self, id: &str, expected: E::State) -> Result<(), EngineError> {
        let tx = self.transactions.begin();

        match self.evaluate(id, expected).await {
            Ok(Evaluation::Processed) => {
                tx.commit();
                Ok(())
            }
            Ok(Evaluation::Skipped(reason)) => {
                debug!(
                    entity = self.entity_kind,
                    id,
                    expected = expected.name(),
                    reason = reason.as_str(),
                    "Trigger skipped"
                );
                record_guard_skip(self.entity_kind, reason.as_str());
                tx.commit();
                Ok(())
            }
            Err(err) if err.is_storage_fault() => {
                tx.rollback();
                Err(err)
            }
            Err(err) => {
                // Business failures park the entity in a safe terminal state
                // before surfacing; that transition must outlive the error.
                tx.commit();
                Err(err)
            }
        }
    }

    /// The guard chain of §4.1, in order, then the handler.
    async fn evaluate(&self, id: &str, expected: E::State) -> Result<Evaluation, EngineError> {
        let Some(entity) = self.store.find_by_id(id).await? else {
            return Err(EngineError::NotFound {
                entity_kind: self.entity_kind,
                id: id.to_string(),
            });
        };

        if entity.state().is_terminal() {
            return Ok(Evaluation::Skipped(SkipReason::AlreadyFinal));
        }

        if entity.state() != expected {
            return Ok(Evaluation::Skipped(SkipReason::Stale));
        }

        let Some(handler) = self.handlers.get(&expected) else {
            return Ok(Evaluation::Skipped(SkipReason::NoHandler));
        };

        if let Some(required) = handler.role.violated_by(entity.role()) {
            match self.role_mismatch {
                RoleMismatchPolicy::Skip => {
                    return Ok(Evaluation::Skipped(SkipReason::RoleMismatch));
                }
                RoleMismatchPolicy::Fail => {
                    return Err(EngineError::RoleMismatch {
                        entity_kind: self.entity_kind,
                        id: id.to_string(),
                        state: expected.name(),
                        required,
                        actual: entity.role(),
                    });
                }
            }
        }

        if self.pending.test(&entity) {
            return Ok(Evaluation::Skipped(SkipReason::Pending));
        }

        (handler.run)(Arc::clone(&self.context), entity).await?;
        Ok(Evaluation::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContractOffer, Negotiation, NegotiationState, Policy};
    use crate::persistence::{InMemoryStore, NoopTransactionContext};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingContext {
        invocations: AtomicUsize,
    }

    fn run_handler(
        ctx: Arc<CountingContext>,
        _entity: Negotiation,
    ) -> futures::future::BoxFuture<'static, Result<(), EngineError>> {
        Box::pin(async move {
            ctx.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    struct AlwaysPending;

    impl PendingGuard<Negotiation> for AlwaysPending {
        fn test(&self, _entity: &Negotiation) -> bool {
            true
        }
    }

    fn offer() -> ContractOffer {
        ContractOffer::new("offer-1", "asset-1", Policy::new().with_target("asset-1"))
    }

    fn consumer_negotiation() -> Negotiation {
        Negotiation::initiate_as_consumer(
            "provider-1",
            "https://provider.example/protocol",
            "dataspace-protocol-http",
            offer(),
        )
    }

    fn engine_with(
        store: Arc<InMemoryStore<Negotiation>>,
        pending: Arc<dyn PendingGuard<Negotiation>>,
        policy: RoleMismatchPolicy,
        binding: RoleBinding,
    ) -> (
        StateMachineEngine<CountingContext, Negotiation>,
        Arc<CountingContext>,
    ) {
        let context = Arc::new(CountingContext {
            invocations: AtomicUsize::new(0),
        });
        let handlers =
            HandlerTable::new().bind(NegotiationState::Initial, binding, run_handler);
        let engine = StateMachineEngine::new(
            "negotiation",
            store as Arc<dyn EntityStore<Negotiation>>,
            Arc::new(NoopTransactionContext),
            pending,
            policy,
            handlers,
            context.clone(),
        );
        (engine, context)
    }

    #[tokio::test]
    async fn test_unknown_entity_is_a_hard_failure() {
        let store = Arc::new(InMemoryStore::new());
        let (engine, context) = engine_with(
            store,
            Arc::new(NeverPending),
            RoleMismatchPolicy::Skip,
            RoleBinding::Any,
        );

        let result = engine.handle("missing", NegotiationState::Initial).await;
        assert!(matches!(result, Err(EngineError::NotFound { .. })));
        assert_eq!(context.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_trigger_skips_without_invoking_handler() {
        let store = Arc::new(InMemoryStore::new());
        let negotiation = consumer_negotiation();
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        let (engine, context) = engine_with(
            store,
            Arc::new(NeverPending),
            RoleMismatchPolicy::Skip,
            RoleBinding::Any,
        );

        // Entity is in INITIAL, trigger claims REQUESTING.
        engine.handle(&id, NegotiationState::Requesting).await.unwrap();
        assert_eq!(context.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_matching_trigger_invokes_handler_once() {
        let store = Arc::new(InMemoryStore::new());
        let negotiation = consumer_negotiation();
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        let (engine, context) = engine_with(
            store,
            Arc::new(NeverPending),
            RoleMismatchPolicy::Skip,
            RoleBinding::Any,
        );

        engine.handle(&id, NegotiationState::Initial).await.unwrap();
        assert_eq!(context.invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pending_guard_suspends_processing() {
        let store = Arc::new(InMemoryStore::new());
        let negotiation = consumer_negotiation();
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        let (engine, context) = engine_with(
            store,
            Arc::new(AlwaysPending),
            RoleMismatchPolicy::Skip,
            RoleBinding::Any,
        );

        engine.handle(&id, NegotiationState::Initial).await.unwrap();
        assert_eq!(context.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_role_mismatch_skip_policy() {
        let store = Arc::new(InMemoryStore::new());
        let negotiation = consumer_negotiation();
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        let (engine, context) = engine_with(
            store,
            Arc::new(NeverPending),
            RoleMismatchPolicy::Skip,
            RoleBinding::Only(Role::Provider),
        );

        engine.handle(&id, NegotiationState::Initial).await.unwrap();
        assert_eq!(context.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_role_mismatch_fail_policy() {
        let store = Arc::new(InMemoryStore::new());
        let negotiation = consumer_negotiation();
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        let (engine, context) = engine_with(
            store,
            Arc::new(NeverPending),
            RoleMismatchPolicy::Fail,
            RoleBinding::Only(Role::Provider),
        );

        let result = engine.handle(&id, NegotiationState::Initial).await;
        assert!(matches!(result, Err(EngineError::RoleMismatch { .. })));
        assert_eq!(context.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_handler_state_is_a_noop() {
        let store = Arc::new(InMemoryStore::new());
        let mut negotiation = consumer_negotiation();
        negotiation.transition_to(NegotiationState::Offered);
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        let (engine, context) = engine_with(
            store,
            Arc::new(NeverPending),
            RoleMismatchPolicy::Skip,
            RoleBinding::Any,
        );

        engine.handle(&id, NegotiationState::Offered).await.unwrap();
        assert_eq!(context.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_terminal_state_absorbs_all_triggers() {
        let store = Arc::new(InMemoryStore::new());
        let mut negotiation = consumer_negotiation();
        negotiation.transition_to(NegotiationState::Terminated);
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        let (engine, context) = engine_with(
            store.clone(),
            Arc::new(NeverPending),
            RoleMismatchPolicy::Skip,
            RoleBinding::Any,
        );

        for _ in 0..3 {
            engine.handle(&id, NegotiationState::Terminated).await.unwrap();
        }
        assert_eq!(context.invocations.load(Ordering::SeqCst), 0);

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.state(), NegotiationState::Terminated);
    }
}
