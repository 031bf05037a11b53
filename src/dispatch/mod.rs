// dispatch/mod.rs - Protocol Message Dispatch

//! Outbound protocol messaging: the universal envelope, the typed message
//! set for both protocols, the dispatcher-registry seam the transport plugs
//! into, and the adapter enforcing the retry-stable message-id discipline.

mod adapter;
mod envelope;
mod messages;
mod registry;

pub use adapter::DispatchAdapter;
pub use envelope::ProtocolEnvelope;
pub use messages::{
    AgreementVerificationMessage, ContractAgreementMessage, ContractOfferMessage,
    ContractRequestKind, ContractRequestMessage, DispatchAck, NegotiationEventKind,
    NegotiationEventMessage, NegotiationTerminationMessage, ProtocolMessage,
    TransferCompletionMessage, TransferRequestMessage, TransferStartMessage,
    TransferSuspensionMessage, TransferTerminationMessage,
};
pub use registry::{DispatchError, DispatcherRegistry, LoopbackDispatcher};
