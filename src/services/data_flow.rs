// services/data_flow.rs - Data Flow Manager

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use crate::engine::ProtocolEntity;
use crate::model::{DataAddress, Policy, TransferProcess};

/// Data-flow collaborator failure; always escalates the transfer to
/// TERMINATED with this detail attached.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DataFlowError(pub String);

/// Result of a successful flow start.
#[derive(Debug, Clone)]
pub struct DataFlowStarted {
    /// Data-plane worker assigned to move the bytes.
    pub data_plane_id: String,

    /// Address the consumer pulls from, when the flow exposes one.
    pub data_address: Option<DataAddress>,
}

/// The subsystem that actually moves bytes for a transfer. Opaque here:
/// provisioning, wire protocols and flow supervision are its business.
#[async_trait]
pub trait DataFlowManager: Send + Sync {
    async fn start(
        &self,
        process: &TransferProcess,
        policy: &Policy,
    ) -> Result<DataFlowStarted, DataFlowError>;

    async fn terminate(&self, process: &TransferProcess) -> Result<(), DataFlowError>;

    async fn suspend(&self, process: &TransferProcess) -> Result<(), DataFlowError>;
}

/// Operations the [`StubDataFlowManager`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOp {
    Start,
    Terminate,
    Suspend,
}

/// Always-succeeding manager for tests and the demo. Mints a data-plane id
/// per start, records every operation, and can be armed to fail.
pub struct StubDataFlowManager {
    ops: Mutex<Vec<FlowOp>>,
    fail_next: Mutex<Option<String>>,
}

impl StubDataFlowManager {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    /// Fail the next operation with `detail`.
    pub fn fail_next(&self, detail: &str) {
        *self.fail_next.lock() = Some(detail.to_string());
    }

    pub fn ops(&self) -> Vec<FlowOp> {
        self.ops.lock().clone()
    }

    fn record(&self, op: FlowOp) -> Result<(), DataFlowError> {
        if let Some(detail) = self.fail_next.lock().take() {
            return Err(DataFlowError(detail));
        }
        self.ops.lock().push(op);
        Ok(())
    }
}

impl Default for StubDataFlowManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataFlowManager for StubDataFlowManager {
    async fn start(
        &self,
        process: &TransferProcess,
        _policy: &Policy,
    ) -> Result<DataFlowStarted, DataFlowError> {
        self.record(FlowOp::Start)?;
        let data_plane_id = uuid::Uuid::new_v4().to_string();
        info!(
            process = process.id(),
            data_plane_id = %data_plane_id,
            "Stub data flow started"
        );
        Ok(DataFlowStarted {
            data_plane_id,
            data_address: process.content_data_address().cloned(),
        })
    }

    async fn terminate(&self, _process: &TransferProcess) -> Result<(), DataFlowError> {
        self.record(FlowOp::Terminate)
    }

    async fn suspend(&self, _process: &TransferProcess) -> Result<(), DataFlowError> {
        self.record(FlowOp::Suspend)
    }
}
