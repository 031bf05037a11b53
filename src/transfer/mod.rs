// transfer/mod.rs - Transfer Process Orchestrator

//! Drives [`TransferProcess`] entities through
//! provisioning/start/completion/suspension/termination.
//!
//! The `*_REQUESTED` states share their handler with the plain state: both
//! mean "this outcome is in flight", and the handler branches on whether the
//! counterparty asked for it rather than on the state code.

mod handlers;
mod observable;

pub use handlers::TransferServices;
pub use observable::{TransferListener, TransferObservable, TransferTransition};

use std::sync::Arc;

use crate::dispatch::{DispatchAdapter, DispatcherRegistry};
use crate::engine::{
    EngineError, HandlerTable, NeverPending, PendingGuard, RoleBinding, RoleMismatchPolicy,
    StateMachineEngine, TransitionExecutor,
};
use crate::model::{TransferProcess, TransferState};
use crate::persistence::{EntityStore, NoopTransactionContext, TransactionContext};
use crate::services::{DataAddressResolver, DataFlowManager, PolicyArchive, Vault, WebhookRegistry};

const ENTITY_KIND: &str = "transfer_process";

/// The transfer orchestrator: one [`handle`](Self::handle) call drives one
/// process one step.
pub struct TransferOrchestrator {
    engine: StateMachineEngine<TransferServices, TransferProcess>,
}

impl TransferOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn builder(
        store: Arc<dyn EntityStore<TransferProcess>>,
        dispatcher: Arc<dyn DispatcherRegistry>,
        webhooks: Arc<dyn WebhookRegistry>,
        policies: Arc<dyn PolicyArchive>,
        addresses: Arc<dyn DataAddressResolver>,
        data_flow: Arc<dyn DataFlowManager>,
        vault: Arc<dyn Vault>,
    ) -> TransferOrchestratorBuilder {
        TransferOrchestratorBuilder {
            store,
            dispatcher,
            webhooks,
            policies,
            addresses,
            data_flow,
            vault,
            transactions: Arc::new(NoopTransactionContext),
            pending: Arc::new(NeverPending),
            observable: TransferObservable::new(),
        }
    }

    /// Drive transfer `id` if it still is in `expected` state. Safe to call
    /// repeatedly and concurrently.
    pub async fn handle(&self, id: &str, expected: TransferState) -> Result<(), EngineError> {
        self.engine.handle(id, expected).await
    }
}

pub struct TransferOrchestratorBuilder {
    store: Arc<dyn EntityStore<TransferProcess>>,
    dispatcher: Arc<dyn DispatcherRegistry>,
    webhooks: Arc<dyn WebhookRegistry>,
    policies: Arc<dyn PolicyArchive>,
    addresses: Arc<dyn DataAddressResolver>,
    data_flow: Arc<dyn DataFlowManager>,
    vault: Arc<dyn Vault>,
    transactions: Arc<dyn TransactionContext>,
    pending: Arc<dyn PendingGuard<TransferProcess>>,
    observable: TransferObservable,
}

impl TransferOrchestratorBuilder {
    pub fn with_transaction_context(mut self, transactions: Arc<dyn TransactionContext>) -> Self {
        self.transactions = transactions;
        self
    }

    pub fn with_pending_guard(mut self, pending: Arc<dyn PendingGuard<TransferProcess>>) -> Self {
        self.pending = pending;
        self
    }

    pub fn with_listener(self, listener: Arc<dyn TransferListener>) -> Self {
        self.observable.register(listener);
        self
    }

    pub fn build(self) -> TransferOrchestrator {
        let observable = Arc::new(self.observable);
        let executor = TransitionExecutor::new(ENTITY_KIND, self.store.clone(), observable);
        let adapter = DispatchAdapter::new(self.dispatcher, self.store.clone());
        let services = Arc::new(TransferServices::new(
            executor,
            adapter,
            self.webhooks,
            self.policies,
            self.addresses,
            self.data_flow,
            self.vault,
        ));

        TransferOrchestrator {
            engine: StateMachineEngine::new(
                ENTITY_KIND,
                self.store,
                self.transactions,
                self.pending,
                // Most transfer states are any-role; a role mismatch on the
                // gated ones is a wiring bug and fails hard.
                RoleMismatchPolicy::Fail,
                handler_table(),
                services,
            ),
        }
    }
}

/// State -> (handler, required role). The `*_REQUESTED` variants bind the
/// same handler as their plain state.
fn handler_table() -> HandlerTable<TransferServices, TransferProcess> {
    use crate::engine::Role;
    use TransferState::*;

    HandlerTable::new()
        .bind(Initial, RoleBinding::Any, |s: Arc<TransferServices>, p| {
            Box::pin(async move { s.process_initial(p).await })
        })
        .bind(Provisioning, RoleBinding::Only(Role::Provider), |s, p| {
            Box::pin(async move { s.process_provisioning(p).await })
        })
        .bind(Provisioned, RoleBinding::Any, |s, p| {
            Box::pin(async move { s.process_provisioned(p).await })
        })
        .bind(Requesting, RoleBinding::Only(Role::Consumer), |s, p| {
            Box::pin(async move { s.process_requesting(p).await })
        })
        .bind(Starting, RoleBinding::Only(Role::Provider), |s, p| {
            Box::pin(async move { s.process_starting(p).await })
        })
        .bind(Suspending, RoleBinding::Any, |s, p| {
            Box::pin(async move { s.process_suspending(p).await })
        })
        .bind(SuspendingRequested, RoleBinding::Any, |s, p| {
            Box::pin(async move { s.process_suspending(p).await })
        })
        .bind(Completing, RoleBinding::Any, |s, p| {
            Box::pin(async move { s.process_completing(p).await })
        })
        .bind(CompletingRequested, RoleBinding::Any, |s, p| {
            Box::pin(async move { s.process_completing(p).await })
        })
        .bind(Terminating, RoleBinding::Any, |s, p| {
            Box::pin(async move { s.process_terminating(p).await })
        })
        .bind(TerminatingRequested, RoleBinding::Any, |s, p| {
            Box::pin(async move { s.process_terminating(p).await })
        })
}
