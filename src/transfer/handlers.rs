// transfer/handlers.rs - Transfer State Handlers

use std::sync::Arc;

use tracing::debug;

use super::observable::TransferTransition;
use crate::dispatch::{
    DispatchAdapter, ProtocolMessage, TransferCompletionMessage, TransferRequestMessage,
    TransferStartMessage, TransferSuspensionMessage, TransferTerminationMessage,
};
use crate::engine::{EngineError, ProtocolEntity, RemoteEntity, Role, TransitionExecutor};
use crate::model::{DataAddress, TransferProcess, SECRET_PROPERTY};
use crate::services::{
    DataAddressResolver, DataFlowManager, PolicyArchive, Vault, WebhookRegistry,
};

/// Collaborator bundle the transfer handlers run against.
pub struct TransferServices {
    executor: TransitionExecutor<TransferProcess, TransferTransition>,
    dispatcher: DispatchAdapter<TransferProcess>,
    webhooks: Arc<dyn WebhookRegistry>,
    policies: Arc<dyn PolicyArchive>,
    addresses: Arc<dyn DataAddressResolver>,
    data_flow: Arc<dyn DataFlowManager>,
    vault: Arc<dyn Vault>,
}

impl TransferServices {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        executor: TransitionExecutor<TransferProcess, TransferTransition>,
        dispatcher: DispatchAdapter<TransferProcess>,
        webhooks: Arc<dyn WebhookRegistry>,
        policies: Arc<dyn PolicyArchive>,
        addresses: Arc<dyn DataAddressResolver>,
        data_flow: Arc<dyn DataFlowManager>,
        vault: Arc<dyn Vault>,
    ) -> Self {
        Self {
            executor,
            dispatcher,
            webhooks,
            policies,
            addresses,
            data_flow,
            vault,
        }
    }

    /// INITIAL: both roles validate the governing policy; the consumer heads
    /// for REQUESTING, the provider resolves its source and provisions.
    pub(super) async fn process_initial(
        &self,
        process: TransferProcess,
    ) -> Result<(), EngineError> {
        if self
            .policies
            .find_policy_for_contract(process.contract_id())
            .await
            .is_none()
        {
            let detail = format!("no policy found for contract '{}'", process.contract_id());
            return self.fail(process, TransferTransition::ToTerminated, detail).await;
        }

        match process.role() {
            Role::Consumer => {
                self.executor
                    .apply(process, TransferTransition::ToRequesting, |p| {
                        // No data-plane worker is assigned yet on this side.
                        p.set_data_plane_id(None)
                    })
                    .await
                    .map(drop)
            }
            Role::Provider => {
                let Some(address) = self.addresses.resolve_for_asset(process.asset_id()).await
                else {
                    let detail =
                        format!("no data address resolvable for asset '{}'", process.asset_id());
                    return self
                        .fail(process, TransferTransition::ToTerminating, detail)
                        .await;
                };
                self.executor
                    .apply(process, TransferTransition::ToProvisioning, |p| {
                        p.set_content_data_address(Some(address))
                    })
                    .await
                    .map(drop)
            }
        }
    }

    /// PROVISIONING: resource preparation is fully delegated to the
    /// data-flow subsystem, so the control plane just advances.
    pub(super) async fn process_provisioning(
        &self,
        process: TransferProcess,
    ) -> Result<(), EngineError> {
        self.advance(process, TransferTransition::ToProvisioned)
            .await
    }

    /// PROVISIONED: each role resumes its own track.
    pub(super) async fn process_provisioned(
        &self,
        process: TransferProcess,
    ) -> Result<(), EngineError> {
        let transition = match process.role() {
            Role::Consumer => TransferTransition::ToRequesting,
            Role::Provider => TransferTransition::ToStarting,
        };
        self.advance(process, transition).await
    }

    /// REQUESTING: send the transfer request, inlining any vault-held sink
    /// credential, and learn the provider's pid from the acknowledgement.
    pub(super) async fn process_requesting(
        &self,
        mut process: TransferProcess,
    ) -> Result<(), EngineError> {
        let Some(callback) = self.webhooks.resolve(process.protocol()) else {
            let detail = format!(
                "no callback endpoint registered for protocol '{}'",
                process.protocol()
            );
            return self.fail(process, TransferTransition::ToTerminated, detail).await;
        };

        let destination = match self.inline_destination_secret(&process) {
            Ok(destination) => destination,
            Err(detail) => {
                return self.fail(process, TransferTransition::ToTerminated, detail).await;
            }
        };

        let contract_id = process.contract_id().to_string();
        let transfer_type = process.transfer_type().to_string();
        let ack = self
            .dispatcher
            .send(&mut process, |envelope| {
                ProtocolMessage::TransferRequest(TransferRequestMessage {
                    envelope,
                    contract_id,
                    transfer_type,
                    data_destination: destination,
                    callback_address: callback,
                })
            })
            .await?;

        self.executor
            .apply(process, TransferTransition::ToRequested, |p| {
                if let Some(pid) = ack.provider_pid {
                    p.set_correlation_id(pid);
                }
            })
            .await
            .map(drop)
    }

    /// STARTING: start the flow, record the assigned data-plane worker and
    /// announce the start with the resulting source address.
    pub(super) async fn process_starting(
        &self,
        mut process: TransferProcess,
    ) -> Result<(), EngineError> {
        let Some(policy) = self
            .policies
            .find_policy_for_contract(process.contract_id())
            .await
        else {
            let detail = format!("no policy found for contract '{}'", process.contract_id());
            return self.fail(process, TransferTransition::ToTerminated, detail).await;
        };

        let started = match self.data_flow.start(&process, &policy).await {
            Ok(started) => started,
            Err(err) => {
                return self
                    .fail_data_flow(process, format!("data flow start refused: {err}"))
                    .await;
            }
        };

        process.set_data_plane_id(Some(started.data_plane_id));
        let data_address = started.data_address;
        self.dispatcher
            .send(&mut process, |envelope| {
                ProtocolMessage::TransferStart(TransferStartMessage {
                    envelope,
                    data_address,
                })
            })
            .await?;

        self.advance(process, TransferTransition::ToStarted).await
    }

    /// TERMINATING and TERMINATING_REQUESTED.
    pub(super) async fn process_terminating(
        &self,
        mut process: TransferProcess,
    ) -> Result<(), EngineError> {
        // A consumer whose request was never acknowledged has no remote
        // counterpart to notify.
        if process.role() == Role::Consumer && process.correlation_id().is_none() {
            debug!(id = process.id(), "Terminating before the counterparty knew of the transfer");
            return self.advance(process, TransferTransition::ToTerminated).await;
        }

        if let Err(err) = self.data_flow.terminate(&process).await {
            return self
                .fail_data_flow(process, format!("data flow terminate refused: {err}"))
                .await;
        }

        if process.termination_was_requested_by_counter_party() {
            // The counterparty asked for this; acknowledging happens on the
            // message layer, nothing to dispatch.
            return self.advance(process, TransferTransition::ToTerminated).await;
        }

        let reason = process.error_detail().map(str::to_string);
        self.dispatcher
            .send(&mut process, |envelope| {
                ProtocolMessage::TransferTermination(TransferTerminationMessage {
                    envelope,
                    reason,
                })
            })
            .await?;

        self.advance(process, TransferTransition::ToTerminated).await
    }

    /// COMPLETING and COMPLETING_REQUESTED.
    pub(super) async fn process_completing(
        &self,
        mut process: TransferProcess,
    ) -> Result<(), EngineError> {
        if process.completion_was_requested_by_counter_party() {
            if let Err(err) = self.data_flow.terminate(&process).await {
                return self
                    .fail_data_flow(process, format!("data flow terminate refused: {err}"))
                    .await;
            }
            return self.advance(process, TransferTransition::ToCompleted).await;
        }

        self.dispatcher
            .send(&mut process, |envelope| {
                ProtocolMessage::TransferCompletion(TransferCompletionMessage { envelope })
            })
            .await?;

        self.advance(process, TransferTransition::ToCompleted).await
    }

    /// SUSPENDING and SUSPENDING_REQUESTED.
    pub(super) async fn process_suspending(
        &self,
        mut process: TransferProcess,
    ) -> Result<(), EngineError> {
        if process.role() == Role::Provider {
            if let Err(err) = self.data_flow.suspend(&process).await {
                return self
                    .fail_data_flow(process, format!("data flow suspend refused: {err}"))
                    .await;
            }
        }

        if process.suspension_was_requested_by_counter_party() {
            return self.advance(process, TransferTransition::ToSuspended).await;
        }

        let reason = process.error_detail().map(str::to_string);
        self.dispatcher
            .send(&mut process, |envelope| {
                ProtocolMessage::TransferSuspension(TransferSuspensionMessage { envelope, reason })
            })
            .await?;

        self.advance(process, TransferTransition::ToSuspended).await
    }

    /// Resolve the vault secret referenced by the requested sink, if any,
    /// and inline it into the destination that travels with the request.
    fn inline_destination_secret(
        &self,
        process: &TransferProcess,
    ) -> Result<Option<DataAddress>, String> {
        let Some(destination) = process.data_destination() else {
            return Ok(None);
        };
        let Some(key) = destination.key_name.as_deref() else {
            return Ok(Some(destination.clone()));
        };

        match self.vault.resolve_secret(key) {
            Some(secret) => Ok(Some(
                destination.clone().with_property(SECRET_PROPERTY, &secret),
            )),
            None => Err(format!("secret '{key}' not present in vault")),
        }
    }

    async fn advance(
        &self,
        process: TransferProcess,
        transition: TransferTransition,
    ) -> Result<(), EngineError> {
        self.executor
            .apply(process, transition, |_| {})
            .await
            .map(drop)
    }

    /// Park the process via `transition` with `detail` and surface the
    /// missing prerequisite.
    async fn fail(
        &self,
        process: TransferProcess,
        transition: TransferTransition,
        detail: String,
    ) -> Result<(), EngineError> {
        let id = process.id().to_string();
        self.executor
            .apply(process, transition, |p| {
                p.set_error_detail(Some(detail.clone()))
            })
            .await?;
        Err(EngineError::PrerequisiteMissing { id, detail })
    }

    /// Data-flow refusals always escalate to TERMINATED.
    async fn fail_data_flow(
        &self,
        process: TransferProcess,
        detail: String,
    ) -> Result<(), EngineError> {
        let id = process.id().to_string();
        self.executor
            .apply(process, TransferTransition::ToTerminated, |p| {
                p.set_error_detail(Some(detail.clone()))
            })
            .await?;
        Err(EngineError::DataFlow { id, detail })
    }
}
