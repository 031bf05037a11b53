// engine/executor.rs - Transition Executor

use std::fmt::Debug;
use std::sync::Arc;

use tracing::info;

use super::entity::{ProtocolEntity, StateCode};
use super::error::EngineError;
use crate::observability::record_transition;
use crate::persistence::EntityStore;

/// A named transition of one protocol's state graph.
///
/// Transitions and their observer events are fixed one-to-one; handlers pick
/// a transition, never an ad-hoc event.
pub trait TransitionEvent: Copy + Debug + Send + Sync + 'static {
    type State: StateCode;

    /// State the entity is in after this transition.
    fn target(&self) -> Self::State;

    /// Transition name for logs and metrics.
    fn name(&self) -> &'static str;
}

/// Observer set for one protocol, invoked around persistence.
///
/// Pre hooks fire strictly before the save (audit/veto position), post hooks
/// strictly after. Implementations iterate their listeners fire-and-continue;
/// one listener must not block the others or the transition.
pub trait TransitionObservable<E, T>: Send + Sync {
    fn invoke_pre(&self, transition: T, entity: &E);

    fn invoke_post(&self, transition: T, entity: &E);
}

/// Applies a state change in the fixed commit order:
/// mutate -> pre events -> persist (full upsert) -> post events.
pub struct TransitionExecutor<E: ProtocolEntity, T> {
    entity_kind: &'static str,
    store: Arc<dyn EntityStore<E>>,
    observable: Arc<dyn TransitionObservable<E, T>>,
}

impl<E, T> TransitionExecutor<E, T>
where
    E: ProtocolEntity,
    T: TransitionEvent<State = E::State>,
{
    pub fn new(
        entity_kind: &'static str,
        store: Arc<dyn EntityStore<E>>,
        observable: Arc<dyn TransitionObservable<E, T>>,
    ) -> Self {
        Self {
            entity_kind,
            store,
            observable,
        }
    }

    /// Apply `mutate` plus the state advance of `transition`, persist the
    /// whole entity, and notify observers. Returns the committed entity.
    pub async fn apply<F>(
        &self,
        mut entity: E,
        transition: T,
        mutate: F,
    ) -> Result<E, EngineError>
    where
        F: FnOnce(&mut E),
    {
        let from = entity.state();

        mutate(&mut entity);
        entity.transition_to(transition.target());

        self.observable.invoke_pre(transition, &entity);
        self.store.save(&entity).await?;
        self.observable.invoke_post(transition, &entity);

        record_transition(self.entity_kind, from.name(), entity.state().name());
        info!(
            entity = self.entity_kind,
            id = entity.id(),
            from = from.name(),
            to = entity.state().name(),
            "State transition committed"
        );

        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Negotiation, NegotiationState};
    use crate::negotiation::{NegotiationObservable, NegotiationTransition};
    use crate::persistence::InMemoryStore;

    fn consumer_negotiation() -> Negotiation {
        Negotiation::initiate_as_consumer(
            "provider-1",
            "https://provider.example/protocol",
            "dataspace-protocol-http",
            crate::model::ContractOffer::new(
                "offer-1",
                "asset-1",
                crate::model::Policy::new().with_target("asset-1"),
            ),
        )
    }

    #[tokio::test]
    async fn test_commit_order_persists_mutation_and_state() {
        let store = Arc::new(InMemoryStore::new());
        let executor = TransitionExecutor::new(
            "negotiation",
            store.clone() as Arc<dyn EntityStore<Negotiation>>,
            Arc::new(NegotiationObservable::new()),
        );

        let negotiation = consumer_negotiation();
        let id = negotiation.id().to_string();
        store.save(&negotiation).await.unwrap();

        executor
            .apply(negotiation, NegotiationTransition::ToRequesting, |n| {
                n.set_error_detail(Some("unused".into()))
            })
            .await
            .unwrap();

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.state(), NegotiationState::Requesting);
        assert_eq!(stored.error_detail(), Some("unused"));
    }

    #[tokio::test]
    async fn test_transition_clears_message_id() {
        let store = Arc::new(InMemoryStore::new());
        let executor = TransitionExecutor::new(
            "negotiation",
            store.clone() as Arc<dyn EntityStore<Negotiation>>,
            Arc::new(NegotiationObservable::new()),
        );

        let mut negotiation = consumer_negotiation();
        use crate::engine::RemoteEntity;
        negotiation.set_last_sent_protocol_message_id(Some("msg-1".into()));

        let committed = executor
            .apply(negotiation, NegotiationTransition::ToRequesting, |_| {})
            .await
            .unwrap();

        assert_eq!(committed.last_sent_protocol_message_id(), None);
    }
}
