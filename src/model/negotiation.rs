// model/negotiation.rs - Contract Negotiation Entity

use serde::{Deserialize, Serialize};

use super::contract::{ContractAgreement, ContractOffer};
use crate::engine::{ProtocolEntity, RemoteEntity, Role, StateCode};

/// Negotiation state graph codes.
///
/// Monotonically advancing except for the TERMINATING/TERMINATED exit path,
/// which is reachable from any non-terminal state. Codes are spaced so new
/// states can be inserted without renumbering persisted entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegotiationState {
    Initial,
    Requesting,
    Requested,
    Offering,
    Offered,
    Accepting,
    Accepted,
    Agreeing,
    Agreed,
    Verifying,
    Verified,
    Finalizing,
    Finalized,
    Terminating,
    Terminated,
}

impl NegotiationState {
    pub fn from_code(code: i32) -> Option<Self> {
        use NegotiationState::*;
        match code {
            50 => Some(Initial),
            100 => Some(Requesting),
            200 => Some(Requested),
            300 => Some(Offering),
            400 => Some(Offered),
            500 => Some(Accepting),
            600 => Some(Accepted),
            700 => Some(Agreeing),
            800 => Some(Agreed),
            900 => Some(Verifying),
            1000 => Some(Verified),
            1100 => Some(Finalizing),
            1200 => Some(Finalized),
            1300 => Some(Terminating),
            1400 => Some(Terminated),
            _ => None,
        }
    }
}

impl StateCode for NegotiationState {
    fn code(&self) -> i32 {
        use NegotiationState::*;
        match self {
            Initial => 50,
            Requesting => 100,
            Requested => 200,
            Offering => 300,
            Offered => 400,
            Accepting => 500,
            Accepted => 600,
            Agreeing => 700,
            Agreed => 800,
            Verifying => 900,
            Verified => 1000,
            Finalizing => 1100,
            Finalized => 1200,
            Terminating => 1300,
            Terminated => 1400,
        }
    }

    fn name(&self) -> &'static str {
        use NegotiationState::*;
        match self {
            Initial => "INITIAL",
            Requesting => "REQUESTING",
            Requested => "REQUESTED",
            Offering => "OFFERING",
            Offered => "OFFERED",
            Accepting => "ACCEPTING",
            Accepted => "ACCEPTED",
            Agreeing => "AGREEING",
            Agreed => "AGREED",
            Verifying => "VERIFYING",
            Verified => "VERIFIED",
            Finalizing => "FINALIZING",
            Finalized => "FINALIZED",
            Terminating => "TERMINATING",
            Terminated => "TERMINATED",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, NegotiationState::Finalized | NegotiationState::Terminated)
    }
}

/// One contract negotiation between two parties.
///
/// Mutated exclusively by the negotiation orchestrator's transition executor;
/// never deleted by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Negotiation {
    id: String,
    correlation_id: Option<String>,
    counter_party_id: String,
    counter_party_address: String,
    protocol: String,
    role: Role,
    state: NegotiationState,
    offer_history: Vec<ContractOffer>,
    agreement: Option<ContractAgreement>,
    last_sent_protocol_message_id: Option<String>,
    error_detail: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl Negotiation {
    /// Consumer-side creation: starts in INITIAL with the offer the consumer
    /// wants to request against.
    pub fn initiate_as_consumer(
        counter_party_id: &str,
        counter_party_address: &str,
        protocol: &str,
        initial_offer: ContractOffer,
    ) -> Self {
        Self::create(
            counter_party_id,
            counter_party_address,
            protocol,
            Role::Consumer,
            NegotiationState::Initial,
            initial_offer,
            None,
        )
    }

    /// Provider-side creation: a consumer request already arrived, so the
    /// negotiation starts in REQUESTED with the consumer's pid as
    /// correlation id.
    pub fn initiate_as_provider(
        counter_party_id: &str,
        counter_party_address: &str,
        protocol: &str,
        requested_offer: ContractOffer,
        correlation_id: &str,
    ) -> Self {
        Self::create(
            counter_party_id,
            counter_party_address,
            protocol,
            Role::Provider,
            NegotiationState::Requested,
            requested_offer,
            Some(correlation_id.to_string()),
        )
    }

    fn create(
        counter_party_id: &str,
        counter_party_address: &str,
        protocol: &str,
        role: Role,
        state: NegotiationState,
        offer: ContractOffer,
        correlation_id: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            correlation_id,
            counter_party_id: counter_party_id.to_string(),
            counter_party_address: counter_party_address.to_string(),
            protocol: protocol.to_string(),
            role,
            state,
            offer_history: vec![offer],
            agreement: None,
            last_sent_protocol_message_id: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn offer_history(&self) -> &[ContractOffer] {
        &self.offer_history
    }

    /// The active offer.
    pub fn last_offer(&self) -> Option<&ContractOffer> {
        self.offer_history.last()
    }

    /// Append a counter offer. History is append-only.
    pub fn add_offer(&mut self, offer: ContractOffer) {
        self.offer_history.push(offer);
    }

    pub fn agreement(&self) -> Option<&ContractAgreement> {
        self.agreement.as_ref()
    }

    /// First write wins; the agreement is immutable once set.
    pub fn set_agreement(&mut self, agreement: ContractAgreement) {
        if self.agreement.is_none() {
            self.agreement = Some(agreement);
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn set_error_detail(&mut self, detail: Option<String>) {
        self.error_detail = detail;
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }
}

impl ProtocolEntity for Negotiation {
    type State = NegotiationState;

    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn state(&self) -> NegotiationState {
        self.state
    }

    fn transition_to(&mut self, state: NegotiationState) {
        self.state = state;
        self.last_sent_protocol_message_id = None;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

impl RemoteEntity for Negotiation {
    fn counter_party_id(&self) -> &str {
        &self.counter_party_id
    }

    fn counter_party_address(&self) -> &str {
        &self.counter_party_address
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    fn set_correlation_id(&mut self, id: String) {
        self.correlation_id = Some(id);
    }

    fn last_sent_protocol_message_id(&self) -> Option<&str> {
        self.last_sent_protocol_message_id.as_deref()
    }

    fn set_last_sent_protocol_message_id(&mut self, id: Option<String>) {
        self.last_sent_protocol_message_id = id;
    }
}
