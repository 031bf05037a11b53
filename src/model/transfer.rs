// model/transfer.rs - Transfer Process Entity

use serde::{Deserialize, Serialize};

use super::data_address::DataAddress;
use crate::engine::{ProtocolEntity, RemoteEntity, Role, StateCode};

/// Transfer state graph codes.
///
/// The `*Requested` variants mark that the counterparty initiated the
/// termination/completion/suspension; they share their handler with the
/// plain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferState {
    Initial,
    Provisioning,
    Provisioned,
    Requesting,
    Requested,
    Starting,
    Started,
    Suspending,
    SuspendingRequested,
    Suspended,
    Completing,
    CompletingRequested,
    Completed,
    Terminating,
    TerminatingRequested,
    Terminated,
}

impl TransferState {
    pub fn from_code(code: i32) -> Option<Self> {
        use TransferState::*;
        match code {
            100 => Some(Initial),
            200 => Some(Provisioning),
            300 => Some(Provisioned),
            400 => Some(Requesting),
            500 => Some(Requested),
            600 => Some(Starting),
            700 => Some(Started),
            800 => Some(Suspending),
            850 => Some(SuspendingRequested),
            900 => Some(Suspended),
            1000 => Some(Completing),
            1050 => Some(CompletingRequested),
            1100 => Some(Completed),
            1200 => Some(Terminating),
            1250 => Some(TerminatingRequested),
            1300 => Some(Terminated),
            _ => None,
        }
    }
}

impl StateCode for TransferState {
    fn code(&self) -> i32 {
        use TransferState::*;
        match self {
            Initial => 100,
            Provisioning => 200,
            Provisioned => 300,
            Requesting => 400,
            Requested => 500,
            Starting => 600,
            Started => 700,
            Suspending => 800,
            SuspendingRequested => 850,
            Suspended => 900,
            Completing => 1000,
            CompletingRequested => 1050,
            Completed => 1100,
            Terminating => 1200,
            TerminatingRequested => 1250,
            Terminated => 1300,
        }
    }

    fn name(&self) -> &'static str {
        use TransferState::*;
        match self {
            Initial => "INITIAL",
            Provisioning => "PROVISIONING",
            Provisioned => "PROVISIONED",
            Requesting => "REQUESTING",
            Requested => "REQUESTED",
            Starting => "STARTING",
            Started => "STARTED",
            Suspending => "SUSPENDING",
            SuspendingRequested => "SUSPENDING_REQUESTED",
            Suspended => "SUSPENDED",
            Completing => "COMPLETING",
            CompletingRequested => "COMPLETING_REQUESTED",
            Completed => "COMPLETED",
            Terminating => "TERMINATING",
            TerminatingRequested => "TERMINATING_REQUESTED",
            Terminated => "TERMINATED",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Terminated)
    }
}

/// One data transfer between two parties under an agreed contract.
///
/// Mutated exclusively by the transfer orchestrator's transition executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferProcess {
    id: String,
    correlation_id: Option<String>,
    counter_party_id: String,
    counter_party_address: String,
    protocol: String,
    role: Role,
    state: TransferState,
    contract_id: String,
    asset_id: String,
    transfer_type: String,
    data_destination: Option<DataAddress>,
    content_data_address: Option<DataAddress>,
    data_plane_id: Option<String>,
    termination_requested_by_counter_party: bool,
    completion_requested_by_counter_party: bool,
    suspension_requested_by_counter_party: bool,
    last_sent_protocol_message_id: Option<String>,
    error_detail: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TransferProcess {
    /// Consumer-side creation with the requested sink.
    pub fn initiate_as_consumer(
        counter_party_id: &str,
        counter_party_address: &str,
        protocol: &str,
        contract_id: &str,
        asset_id: &str,
        transfer_type: &str,
        data_destination: Option<DataAddress>,
    ) -> Self {
        let mut process = Self::create(
            counter_party_id,
            counter_party_address,
            protocol,
            Role::Consumer,
            contract_id,
            asset_id,
            transfer_type,
        );
        process.data_destination = data_destination;
        process
    }

    /// Provider-side creation from a received transfer request; the
    /// consumer's pid is already known.
    pub fn initiate_as_provider(
        counter_party_id: &str,
        counter_party_address: &str,
        protocol: &str,
        contract_id: &str,
        asset_id: &str,
        transfer_type: &str,
        correlation_id: &str,
    ) -> Self {
        let mut process = Self::create(
            counter_party_id,
            counter_party_address,
            protocol,
            Role::Provider,
            contract_id,
            asset_id,
            transfer_type,
        );
        process.correlation_id = Some(correlation_id.to_string());
        process
    }

    fn create(
        counter_party_id: &str,
        counter_party_address: &str,
        protocol: &str,
        role: Role,
        contract_id: &str,
        asset_id: &str,
        transfer_type: &str,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            correlation_id: None,
            counter_party_id: counter_party_id.to_string(),
            counter_party_address: counter_party_address.to_string(),
            protocol: protocol.to_string(),
            role,
            state: TransferState::Initial,
            contract_id: contract_id.to_string(),
            asset_id: asset_id.to_string(),
            transfer_type: transfer_type.to_string(),
            data_destination: None,
            content_data_address: None,
            data_plane_id: None,
            termination_requested_by_counter_party: false,
            completion_requested_by_counter_party: false,
            suspension_requested_by_counter_party: false,
            last_sent_protocol_message_id: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn transfer_type(&self) -> &str {
        &self.transfer_type
    }

    pub fn data_destination(&self) -> Option<&DataAddress> {
        self.data_destination.as_ref()
    }

    pub fn content_data_address(&self) -> Option<&DataAddress> {
        self.content_data_address.as_ref()
    }

    pub fn set_content_data_address(&mut self, address: Option<DataAddress>) {
        self.content_data_address = address;
    }

    pub fn data_plane_id(&self) -> Option<&str> {
        self.data_plane_id.as_deref()
    }

    pub fn set_data_plane_id(&mut self, id: Option<String>) {
        self.data_plane_id = id;
    }

    /// Facts derived from message history: whether the counterparty already
    /// asked for the respective outcome, recorded by the message layer.
    pub fn termination_was_requested_by_counter_party(&self) -> bool {
        self.termination_requested_by_counter_party
    }

    pub fn record_counter_party_termination_request(&mut self) {
        self.termination_requested_by_counter_party = true;
    }

    pub fn completion_was_requested_by_counter_party(&self) -> bool {
        self.completion_requested_by_counter_party
    }

    pub fn record_counter_party_completion_request(&mut self) {
        self.completion_requested_by_counter_party = true;
    }

    pub fn suspension_was_requested_by_counter_party(&self) -> bool {
        self.suspension_requested_by_counter_party
    }

    pub fn record_counter_party_suspension_request(&mut self) {
        self.suspension_requested_by_counter_party = true;
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

impl ProtocolEntity for TransferProcess {
    type State = TransferState;

    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn state(&self) -> TransferState {
        self.state
    }

    fn transition_to(&mut self, state: TransferState) {
        self.state = state;
        self.last_sent_protocol_message_id = None;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

impl RemoteEntity for TransferProcess {
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
