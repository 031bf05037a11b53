// negotiation/handlers.rs - Negotiation State Handlers

use std::sync::Arc;

use tracing::debug;

use super::agreement::synthesize_agreement;
use super::observable::NegotiationTransition;
use crate::dispatch::{
    AgreementVerificationMessage, ContractAgreementMessage, ContractRequestKind,
    ContractRequestMessage, DispatchAdapter, NegotiationEventKind, NegotiationEventMessage,
    NegotiationTerminationMessage, ProtocolMessage,
};
use crate::engine::{EngineError, ProtocolEntity, RemoteEntity, TransitionExecutor};
use crate::model::Negotiation;
use crate::services::WebhookRegistry;

/// Collaborator bundle the negotiation handlers run against.
pub struct NegotiationServices {
    participant_id: String,
    executor: TransitionExecutor<Negotiation, NegotiationTransition>,
    dispatcher: DispatchAdapter<Negotiation>,
    webhooks: Arc<dyn WebhookRegistry>,
}

impl NegotiationServices {
    pub(super) fn new(
        participant_id: String,
        executor: TransitionExecutor<Negotiation, NegotiationTransition>,
        dispatcher: DispatchAdapter<Negotiation>,
        webhooks: Arc<dyn WebhookRegistry>,
    ) -> Self {
        Self {
            participant_id,
            executor,
            dispatcher,
            webhooks,
        }
    }

    /// INITIAL: pure advance so the next trigger finds the consumer ready to
    /// send its request.
    pub(super) async fn process_initial(&self, negotiation: Negotiation) -> Result<(), EngineError> {
        self.advance(negotiation, NegotiationTransition::ToRequesting)
            .await
    }

    /// REQUESTING: send the contract request and learn the provider's pid
    /// from the acknowledgement.
    pub(super) async fn process_requesting(
        &self,
        mut negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        let Some(callback) = self.webhooks.resolve(negotiation.protocol()) else {
            let detail = self.no_webhook_detail(&negotiation);
            return self.fail(negotiation, detail).await;
        };

        let kind = if negotiation.offer_history().len() > 1 {
            ContractRequestKind::CounterOffer
        } else {
            ContractRequestKind::Initial
        };
        let offer = self.latest_offer(&negotiation)?;

        let ack = self
            .dispatcher
            .send(&mut negotiation, |envelope| {
                ProtocolMessage::ContractRequest(ContractRequestMessage {
                    envelope,
                    kind,
                    offer,
                    callback_address: callback,
                })
            })
            .await?;

        self.executor
            .apply(negotiation, NegotiationTransition::ToRequested, |n| {
                if let Some(pid) = ack.provider_pid {
                    n.set_correlation_id(pid);
                }
            })
            .await
            .map(drop)
    }

    /// REQUESTED: provider picks the request up and moves on to agreeing.
    pub(super) async fn process_requested(
        &self,
        negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        self.advance(negotiation, NegotiationTransition::ToAgreeing)
            .await
    }

    /// OFFERING: send the provider's offer; the consumer's pid arrives with
    /// the acknowledgement.
    pub(super) async fn process_offering(
        &self,
        mut negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        let Some(callback) = self.webhooks.resolve(negotiation.protocol()) else {
            let detail = self.no_webhook_detail(&negotiation);
            return self.fail(negotiation, detail).await;
        };

        let offer = self.latest_offer(&negotiation)?;
        let ack = self
            .dispatcher
            .send(&mut negotiation, |envelope| {
                ProtocolMessage::ContractOffer(crate::dispatch::ContractOfferMessage {
                    envelope,
                    offer,
                    callback_address: callback,
                })
            })
            .await?;

        self.executor
            .apply(negotiation, NegotiationTransition::ToOffered, |n| {
                if let Some(pid) = ack.consumer_pid {
                    n.set_correlation_id(pid);
                }
            })
            .await
            .map(drop)
    }

    /// ACCEPTING: announce acceptance of the provider's offer.
    pub(super) async fn process_accepting(
        &self,
        mut negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        self.dispatcher
            .send(&mut negotiation, |envelope| {
                ProtocolMessage::NegotiationEvent(NegotiationEventMessage {
                    envelope,
                    event: NegotiationEventKind::Accepted,
                })
            })
            .await?;

        self.advance(negotiation, NegotiationTransition::ToAccepted)
            .await
    }

    /// ACCEPTED: provider moves on to agreeing.
    pub(super) async fn process_accepted(
        &self,
        negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        self.advance(negotiation, NegotiationTransition::ToAgreeing)
            .await
    }

    /// AGREEING: reuse the agreement if a retry already synthesized it, else
    /// derive one from the latest offer, then send it.
    pub(super) async fn process_agreeing(
        &self,
        mut negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        let Some(callback) = self.webhooks.resolve(negotiation.protocol()) else {
            let detail = self.no_webhook_detail(&negotiation);
            return self.fail(negotiation, detail).await;
        };

        let agreement = match negotiation.agreement() {
            Some(existing) => {
                debug!(id = negotiation.id(), "Reusing existing agreement");
                existing.clone()
            }
            None => {
                let offer = self.latest_offer(&negotiation)?;
                synthesize_agreement(
                    &offer,
                    &self.participant_id,
                    negotiation.counter_party_id(),
                    chrono::Utc::now().timestamp_millis(),
                )
            }
        };

        let sent = agreement.clone();
        self.dispatcher
            .send(&mut negotiation, |envelope| {
                ProtocolMessage::ContractAgreement(ContractAgreementMessage {
                    envelope,
                    agreement: sent,
                    callback_address: callback,
                })
            })
            .await?;

        self.executor
            .apply(negotiation, NegotiationTransition::ToAgreed, |n| {
                n.set_agreement(agreement)
            })
            .await
            .map(drop)
    }

    /// VERIFYING: consumer confirms the received agreement.
    pub(super) async fn process_verifying(
        &self,
        mut negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        self.dispatcher
            .send(&mut negotiation, |envelope| {
                ProtocolMessage::AgreementVerification(AgreementVerificationMessage { envelope })
            })
            .await?;

        self.advance(negotiation, NegotiationTransition::ToVerified)
            .await
    }

    /// VERIFIED: provider moves on to finalizing.
    pub(super) async fn process_verified(
        &self,
        negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        self.advance(negotiation, NegotiationTransition::ToFinalizing)
            .await
    }

    /// FINALIZING: announce finalization; the negotiation is done.
    pub(super) async fn process_finalizing(
        &self,
        mut negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        self.dispatcher
            .send(&mut negotiation, |envelope| {
                ProtocolMessage::NegotiationEvent(NegotiationEventMessage {
                    envelope,
                    event: NegotiationEventKind::Finalized,
                })
            })
            .await?;

        self.advance(negotiation, NegotiationTransition::ToFinalized)
            .await
    }

    /// TERMINATING: tell the counterparty why, then park the negotiation.
    pub(super) async fn process_terminating(
        &self,
        mut negotiation: Negotiation,
    ) -> Result<(), EngineError> {
        let reason = negotiation.error_detail().map(str::to_string);
        self.dispatcher
            .send(&mut negotiation, |envelope| {
                ProtocolMessage::NegotiationTermination(NegotiationTerminationMessage {
                    envelope,
                    reason,
                })
            })
            .await?;

        self.advance(negotiation, NegotiationTransition::ToTerminated)
            .await
    }

    async fn advance(
        &self,
        negotiation: Negotiation,
        transition: NegotiationTransition,
    ) -> Result<(), EngineError> {
        self.executor
            .apply(negotiation, transition, |_| {})
            .await
            .map(drop)
    }

    /// Terminate with `detail` and surface the missing prerequisite.
    async fn fail(&self, negotiation: Negotiation, detail: String) -> Result<(), EngineError> {
        let id = negotiation.id().to_string();
        self.executor
            .apply(negotiation, NegotiationTransition::ToTerminated, |n| {
                n.set_error_detail(Some(detail.clone()))
            })
            .await?;
        Err(EngineError::PrerequisiteMissing { id, detail })
    }

    fn no_webhook_detail(&self, negotiation: &Negotiation) -> String {
        format!(
            "no callback endpoint registered for protocol '{}'",
            negotiation.protocol()
        )
    }

    fn latest_offer(
        &self,
        negotiation: &Negotiation,
    ) -> Result<crate::model::ContractOffer, EngineError> {
        negotiation.last_offer().cloned().ok_or_else(|| {
            EngineError::Internal(format!(
                "negotiation '{}' has an empty offer history",
                negotiation.id()
            ))
        })
    }
}
