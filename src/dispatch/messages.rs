// dispatch/messages.rs - Typed Protocol Messages

use serde::{Deserialize, Serialize};

use super::envelope::ProtocolEnvelope;
use crate::model::{ContractAgreement, ContractOffer, DataAddress};

/// Whether a contract request opens the negotiation or counters an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractRequestKind {
    Initial,
    CounterOffer,
}

/// Discrete lifecycle announcements carried by a negotiation event message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationEventKind {
    Accepted,
    Finalized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractRequestMessage {
    pub envelope: ProtocolEnvelope,
    pub kind: ContractRequestKind,
    pub offer: ContractOffer,
    pub callback_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractOfferMessage {
    pub envelope: ProtocolEnvelope,
    pub offer: ContractOffer,
    pub callback_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationEventMessage {
    pub envelope: ProtocolEnvelope,
    pub event: NegotiationEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAgreementMessage {
    pub envelope: ProtocolEnvelope,
    pub agreement: ContractAgreement,
    pub callback_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementVerificationMessage {
    pub envelope: ProtocolEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationTerminationMessage {
    pub envelope: ProtocolEnvelope,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequestMessage {
    pub envelope: ProtocolEnvelope,
    pub contract_id: String,
    pub transfer_type: String,
    pub data_destination: Option<DataAddress>,
    pub callback_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStartMessage {
    pub envelope: ProtocolEnvelope,
    pub data_address: Option<DataAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCompletionMessage {
    pub envelope: ProtocolEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSuspensionMessage {
    pub envelope: ProtocolEnvelope,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferTerminationMessage {
    pub envelope: ProtocolEnvelope,
    pub reason: Option<String>,
}

/// Every message this connector can send to a counterparty.
#[derive(Debug, Clone, Serialize, Deserialize, derive_more::From)]
pub enum ProtocolMessage {
    ContractRequest(ContractRequestMessage),
    ContractOffer(ContractOfferMessage),
    NegotiationEvent(NegotiationEventMessage),
    ContractAgreement(ContractAgreementMessage),
    AgreementVerification(AgreementVerificationMessage),
    NegotiationTermination(NegotiationTerminationMessage),
    TransferRequest(TransferRequestMessage),
    TransferStart(TransferStartMessage),
    TransferCompletion(TransferCompletionMessage),
    TransferSuspension(TransferSuspensionMessage),
    TransferTermination(TransferTerminationMessage),
}

impl ProtocolMessage {
    /// Message kind for logs and metrics.
    pub fn kind(&self) -> &'static str {
        use ProtocolMessage::*;
        match self {
            ContractRequest(_) => "contract_request",
            ContractOffer(_) => "contract_offer",
            NegotiationEvent(_) => "negotiation_event",
            ContractAgreement(_) => "contract_agreement",
            AgreementVerification(_) => "agreement_verification",
            NegotiationTermination(_) => "negotiation_termination",
            TransferRequest(_) => "transfer_request",
            TransferStart(_) => "transfer_start",
            TransferCompletion(_) => "transfer_completion",
            TransferSuspension(_) => "transfer_suspension",
            TransferTermination(_) => "transfer_termination",
        }
    }

    pub fn envelope(&self) -> &ProtocolEnvelope {
        use ProtocolMessage::*;
        match self {
            ContractRequest(m) => &m.envelope,
            ContractOffer(m) => &m.envelope,
            NegotiationEvent(m) => &m.envelope,
            ContractAgreement(m) => &m.envelope,
            AgreementVerification(m) => &m.envelope,
            NegotiationTermination(m) => &m.envelope,
            TransferRequest(m) => &m.envelope,
            TransferStart(m) => &m.envelope,
            TransferCompletion(m) => &m.envelope,
            TransferSuspension(m) => &m.envelope,
            TransferTermination(m) => &m.envelope,
        }
    }
}

/// The counterparty's acknowledgement: carries its process ids so the
/// sender can learn the correlation id it is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchAck {
    pub consumer_pid: Option<String>,
    pub provider_pid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Policy;

    fn envelope() -> ProtocolEnvelope {
        ProtocolEnvelope {
            message_id: "msg-1".into(),
            counter_party_id: "provider-1".into(),
            counter_party_address: "https://provider.example/protocol".into(),
            protocol: "dataspace-protocol-http".into(),
            process_id: "local-1".into(),
            consumer_pid: Some("local-1".into()),
            provider_pid: None,
        }
    }

    #[test]
    fn test_message_kinds() {
        let request = ProtocolMessage::from(ContractRequestMessage {
            envelope: envelope(),
            kind: ContractRequestKind::Initial,
            offer: ContractOffer::new("offer-1", "asset-1", Policy::new()),
            callback_address: "https://consumer.example/protocol".into(),
        });
        assert_eq!(request.kind(), "contract_request");
        assert_eq!(request.envelope().message_id, "msg-1");

        let termination = ProtocolMessage::from(TransferTerminationMessage {
            envelope: envelope(),
            reason: Some("expired".into()),
        });
        assert_eq!(termination.kind(), "transfer_termination");
    }
}
