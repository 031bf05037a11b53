// negotiation/agreement.rs - Agreement Synthesis

use crate::model::{ContractAgreement, ContractOffer};

/// Build the agreement sealing a negotiation from its latest offer.
///
/// The offer's policy is stamped onto the agreement with assignment swapped
/// to the concrete parties: the provider assigns, the consumer is assigned.
/// Pure so the agreeing step's dispatch side effect stays separately
/// testable.
pub fn synthesize_agreement(
    latest_offer: &ContractOffer,
    provider_id: &str,
    consumer_id: &str,
    now: i64,
) -> ContractAgreement {
    let policy = latest_offer
        .policy
        .clone()
        .with_assigner(provider_id)
        .with_assignee(consumer_id)
        .with_target(&latest_offer.asset_id);

    ContractAgreement {
        id: uuid::Uuid::new_v4().to_string(),
        provider_id: provider_id.to_string(),
        consumer_id: consumer_id.to_string(),
        signing_date: now,
        asset_id: latest_offer.asset_id.clone(),
        policy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Policy, Rule};

    #[test]
    fn test_synthesis_stamps_parties_and_time() {
        let offer = ContractOffer::new(
            "offer-1",
            "asset-1",
            Policy::new().with_rule(Rule::new("use")),
        );

        let agreement = synthesize_agreement(&offer, "provider-1", "consumer-1", 1_700_000_000_000);

        assert_eq!(agreement.provider_id, "provider-1");
        assert_eq!(agreement.consumer_id, "consumer-1");
        assert_eq!(agreement.signing_date, 1_700_000_000_000);
        assert_eq!(agreement.asset_id, "asset-1");
        assert_eq!(agreement.policy.assigner.as_deref(), Some("provider-1"));
        assert_eq!(agreement.policy.assignee.as_deref(), Some("consumer-1"));
        assert_eq!(agreement.policy.target.as_deref(), Some("asset-1"));
        // Rules carry over from the offer.
        assert_eq!(agreement.policy.rules.len(), 1);
    }

    #[test]
    fn test_each_synthesis_gets_a_fresh_id() {
        let offer = ContractOffer::new("offer-1", "asset-1", Policy::new());
        let a = synthesize_agreement(&offer, "p", "c", 0);
        let b = synthesize_agreement(&offer, "p", "c", 0);
        assert_ne!(a.id, b.id);
    }
}
