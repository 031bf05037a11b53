// transfer/observable.rs - Transfer Transitions and Observers

use parking_lot::RwLock;
use std::sync::Arc;

use crate::engine::{TransitionEvent, TransitionObservable};
use crate::model::{TransferProcess, TransferState};

/// The named transitions of the transfer graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferTransition {
    ToProvisioning,
    ToProvisioned,
    ToRequesting,
    ToRequested,
    ToStarting,
    ToStarted,
    ToSuspended,
    ToCompleted,
    ToTerminating,
    ToTerminated,
}

impl TransitionEvent for TransferTransition {
    type State = TransferState;

    fn target(&self) -> TransferState {
        use TransferTransition::*;
        match self {
            ToProvisioning => TransferState::Provisioning,
            ToProvisioned => TransferState::Provisioned,
            ToRequesting => TransferState::Requesting,
            ToRequested => TransferState::Requested,
            ToStarting => TransferState::Starting,
            ToStarted => TransferState::Started,
            ToSuspended => TransferState::Suspended,
            ToCompleted => TransferState::Completed,
            ToTerminating => TransferState::Terminating,
            ToTerminated => TransferState::Terminated,
        }
    }

    fn name(&self) -> &'static str {
        use TransferTransition::*;
        match self {
            ToProvisioning => "to_provisioning",
            ToProvisioned => "to_provisioned",
            ToRequesting => "to_requesting",
            ToRequested => "to_requested",
            ToStarting => "to_starting",
            ToStarted => "to_started",
            ToSuspended => "to_suspended",
            ToCompleted => "to_completed",
            ToTerminating => "to_terminating",
            ToTerminated => "to_terminated",
        }
    }
}

/// Observer of transfer transitions; hooks default to no-ops.
#[allow(unused_variables)]
pub trait TransferListener: Send + Sync {
    fn pre_provisioning(&self, process: &TransferProcess) {}
    fn provisioning(&self, process: &TransferProcess) {}
    fn pre_provisioned(&self, process: &TransferProcess) {}
    fn provisioned(&self, process: &TransferProcess) {}
    fn pre_requesting(&self, process: &TransferProcess) {}
    fn requesting(&self, process: &TransferProcess) {}
    fn pre_requested(&self, process: &TransferProcess) {}
    fn requested(&self, process: &TransferProcess) {}
    fn pre_starting(&self, process: &TransferProcess) {}
    fn starting(&self, process: &TransferProcess) {}
    fn pre_started(&self, process: &TransferProcess) {}
    fn started(&self, process: &TransferProcess) {}
    fn pre_suspended(&self, process: &TransferProcess) {}
    fn suspended(&self, process: &TransferProcess) {}
    fn pre_completed(&self, process: &TransferProcess) {}
    fn completed(&self, process: &TransferProcess) {}
    fn pre_terminating(&self, process: &TransferProcess) {}
    fn terminating(&self, process: &TransferProcess) {}
    fn pre_terminated(&self, process: &TransferProcess) {}
    fn terminated(&self, process: &TransferProcess) {}
}

/// Listener set for the transfer orchestrator.
pub struct TransferObservable {
    listeners: RwLock<Vec<Arc<dyn TransferListener>>>,
}

impl TransferObservable {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, listener: Arc<dyn TransferListener>) {
        self.listeners.write().push(listener);
    }

    fn for_each(&self, f: impl Fn(&dyn TransferListener)) {
        for listener in self.listeners.read().iter() {
            f(listener.as_ref());
        }
    }
}

impl Default for TransferObservable {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionObservable<TransferProcess, TransferTransition> for TransferObservable {
    fn invoke_pre(&self, transition: TransferTransition, entity: &TransferProcess) {
        use TransferTransition::*;
        self.for_each(|l| match transition {
            ToProvisioning => l.pre_provisioning(entity),
            ToProvisioned => l.pre_provisioned(entity),
            ToRequesting => l.pre_requesting(entity),
            ToRequested => l.pre_requested(entity),
            ToStarting => l.pre_starting(entity),
            ToStarted => l.pre_started(entity),
            ToSuspended => l.pre_suspended(entity),
            ToCompleted => l.pre_completed(entity),
            ToTerminating => l.pre_terminating(entity),
            ToTerminated => l.pre_terminated(entity),
        });
    }

    fn invoke_post(&self, transition: TransferTransition, entity: &TransferProcess) {
        use TransferTransition::*;
        self.for_each(|l| match transition {
            ToProvisioning => l.provisioning(entity),
            ToProvisioned => l.provisioned(entity),
            ToRequesting => l.requesting(entity),
            ToRequested => l.requested(entity),
            ToStarting => l.starting(entity),
            ToStarted => l.started(entity),
            ToSuspended => l.suspended(entity),
            ToCompleted => l.completed(entity),
            ToTerminating => l.terminating(entity),
            ToTerminated => l.terminated(entity),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StateCode;

    #[test]
    fn test_transition_targets() {
        assert_eq!(
            TransferTransition::ToStarted.target(),
            TransferState::Started
        );
        assert!(TransferTransition::ToCompleted.target().is_terminal());
        assert!(!TransferTransition::ToSuspended.target().is_terminal());
    }
}
