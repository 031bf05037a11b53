// lib.rs - Dataspace Connector Control Plane
//
// State-machine orchestration core for contract negotiation and data
// transfer between dataspace participants.

#![doc = include_str!("../README.md")]

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod model;
pub mod negotiation;
pub mod observability;
pub mod persistence;
pub mod services;
pub mod transfer;

// Re-export commonly used types
pub use engine::{
    EngineError, HandlerTable, NeverPending, PendingGuard, ProtocolEntity, RemoteEntity, Role,
    RoleBinding, RoleMismatchPolicy, SkipReason, StateCode, StateMachineEngine, TransitionEvent,
    TransitionExecutor, TransitionObservable,
};

pub use model::{
    ContractAgreement, ContractOffer, DataAddress, Negotiation, NegotiationState, Policy,
    TransferProcess, TransferState,
};

pub use negotiation::{synthesize_agreement, NegotiationListener, NegotiationOrchestrator};

pub use transfer::{TransferListener, TransferOrchestrator};

pub use observability::{
    init_metrics, init_tracing, MetricsConfig, MetricsHandle, TracingConfig, TracingFormat,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::ConnectorConfig;
    pub use crate::dispatch::{
        DispatchAck, DispatchError, DispatcherRegistry, LoopbackDispatcher, ProtocolMessage,
    };
    pub use crate::engine::{
        EngineError, PendingGuard, ProtocolEntity, RemoteEntity, Role, StateCode,
    };
    pub use crate::model::{
        ContractAgreement, ContractOffer, DataAddress, Negotiation, NegotiationState, Policy,
        TransferProcess, TransferState,
    };
    pub use crate::negotiation::{NegotiationListener, NegotiationOrchestrator};
    pub use crate::persistence::{EntityStore, InMemoryStore};
    pub use crate::services::{
        InMemoryAddressResolver, InMemoryPolicyArchive, InMemoryVault, InMemoryWebhookRegistry,
        StubDataFlowManager,
    };
    pub use crate::transfer::{TransferListener, TransferOrchestrator};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
