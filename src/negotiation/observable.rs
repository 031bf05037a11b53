// negotiation/observable.rs - Negotiation Transitions and Observers

use parking_lot::RwLock;
use std::sync::Arc;

use crate::engine::{TransitionEvent, TransitionObservable};
use crate::model::{Negotiation, NegotiationState};

/// The named transitions of the negotiation graph. Each carries exactly one
/// pre/post listener hook pair; handlers never emit ad-hoc events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationTransition {
    ToRequesting,
    ToRequested,
    ToOffered,
    ToAccepted,
    ToAgreeing,
    ToAgreed,
    ToVerified,
    ToFinalizing,
    ToFinalized,
    ToTerminated,
}

impl TransitionEvent for NegotiationTransition {
    type State = NegotiationState;

    fn target(&self) -> NegotiationState {
        use NegotiationTransition::*;
        match self {
            ToRequesting => NegotiationState::Requesting,
            ToRequested => NegotiationState::Requested,
            ToOffered => NegotiationState::Offered,
            ToAccepted => NegotiationState::Accepted,
            ToAgreeing => NegotiationState::Agreeing,
            ToAgreed => NegotiationState::Agreed,
            ToVerified => NegotiationState::Verified,
            ToFinalizing => NegotiationState::Finalizing,
            ToFinalized => NegotiationState::Finalized,
            ToTerminated => NegotiationState::Terminated,
        }
    }

    fn name(&self) -> &'static str {
        use NegotiationTransition::*;
        match self {
            ToRequesting => "to_requesting",
            ToRequested => "to_requested",
            ToOffered => "to_offered",
            ToAccepted => "to_accepted",
            ToAgreeing => "to_agreeing",
            ToAgreed => "to_agreed",
            ToVerified => "to_verified",
            ToFinalizing => "to_finalizing",
            ToFinalized => "to_finalized",
            ToTerminated => "to_terminated",
        }
    }
}

/// Observer of negotiation transitions.
///
/// `pre_*` hooks fire before the entity is persisted (audit position),
/// the plain hooks after. All methods default to no-ops so listeners only
/// implement what they care about.
#[allow(unused_variables)]
pub trait NegotiationListener: Send + Sync {
    fn pre_requesting(&self, negotiation: &Negotiation) {}
    fn requesting(&self, negotiation: &Negotiation) {}
    fn pre_requested(&self, negotiation: &Negotiation) {}
    fn requested(&self, negotiation: &Negotiation) {}
    fn pre_offered(&self, negotiation: &Negotiation) {}
    fn offered(&self, negotiation: &Negotiation) {}
    fn pre_accepted(&self, negotiation: &Negotiation) {}
    fn accepted(&self, negotiation: &Negotiation) {}
    fn pre_agreeing(&self, negotiation: &Negotiation) {}
    fn agreeing(&self, negotiation: &Negotiation) {}
    fn pre_agreed(&self, negotiation: &Negotiation) {}
    fn agreed(&self, negotiation: &Negotiation) {}
    fn pre_verified(&self, negotiation: &Negotiation) {}
    fn verified(&self, negotiation: &Negotiation) {}
    fn pre_finalizing(&self, negotiation: &Negotiation) {}
    fn finalizing(&self, negotiation: &Negotiation) {}
    fn pre_finalized(&self, negotiation: &Negotiation) {}
    fn finalized(&self, negotiation: &Negotiation) {}
    fn pre_terminated(&self, negotiation: &Negotiation) {}
    fn terminated(&self, negotiation: &Negotiation) {}
}

/// Listener set for the negotiation orchestrator.
pub struct NegotiationObservable {
    listeners: RwLock<Vec<Arc<dyn NegotiationListener>>>,
}

impl NegotiationObservable {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, listener: Arc<dyn NegotiationListener>) {
        self.listeners.write().push(listener);
    }

    fn for_each(&self, f: impl Fn(&dyn NegotiationListener)) {
        for listener in self.listeners.read().iter() {
            f(listener.as_ref());
        }
    }
}

impl Default for NegotiationObservable {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionObservable<Negotiation, NegotiationTransition> for NegotiationObservable {
    fn invoke_pre(&self, transition: NegotiationTransition, entity: &Negotiation) {
        use NegotiationTransition::*;
        self.for_each(|l| match transition {
            ToRequesting => l.pre_requesting(entity),
            ToRequested => l.pre_requested(entity),
            ToOffered => l.pre_offered(entity),
            ToAccepted => l.pre_accepted(entity),
            ToAgreeing => l.pre_agreeing(entity),
            ToAgreed => l.pre_agreed(entity),
            ToVerified => l.pre_verified(entity),
            ToFinalizing => l.pre_finalizing(entity),
            ToFinalized => l.pre_finalized(entity),
            ToTerminated => l.pre_terminated(entity),
        });
    }

    fn invoke_post(&self, transition: NegotiationTransition, entity: &Negotiation) {
        use NegotiationTransition::*;
        self.for_each(|l| match transition {
            ToRequesting => l.requesting(entity),
            ToRequested => l.requested(entity),
            ToOffered => l.offered(entity),
            ToAccepted => l.accepted(entity),
            ToAgreeing => l.agreeing(entity),
            ToAgreed => l.agreed(entity),
            ToVerified => l.verified(entity),
            ToFinalizing => l.finalizing(entity),
            ToFinalized => l.finalized(entity),
            ToTerminated => l.terminated(entity),
        });
    }
}
