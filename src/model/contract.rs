// model/contract.rs - Offers, Agreements and the Policy Model

use serde::{Deserialize, Serialize};

/// A single constraint on a rule, e.g. `region eq EU`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub left_operand: String,
    pub operator: String,
    pub right_operand: String,
}

impl Constraint {
    pub fn new(left: &str, operator: &str, right: &str) -> Self {
        Self {
            left_operand: left.to_string(),
            operator: operator.to_string(),
            right_operand: right.to_string(),
        }
    }
}

/// A permitted action with its constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub action: String,
    pub constraints: Vec<Constraint>,
}

impl Rule {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Usage policy attached to an offer or agreement.
///
/// Evaluation of policies happens outside this crate; the model only has to
/// be rich enough to travel inside protocol messages and agreements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Party granting the usage rights (the provider on agreements).
    pub assigner: Option<String>,

    /// Party receiving the usage rights (the consumer on agreements).
    pub assignee: Option<String>,

    /// The asset the policy governs.
    pub target: Option<String>,

    /// Permitted actions.
    pub rules: Vec<Rule>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn with_assigner(mut self, assigner: &str) -> Self {
        self.assigner = Some(assigner.to_string());
        self
    }

    pub fn with_assignee(mut self, assignee: &str) -> Self {
        self.assignee = Some(assignee.to_string());
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// A contract offer exchanged during negotiation.
///
/// Offers are append-only on the negotiation; the most recent one is the
/// active offer a request or agreement is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOffer {
    /// Offer id, owned by whichever side made the offer.
    pub id: String,

    /// Asset the offer is about.
    pub asset_id: String,

    /// Usage policy proposed for the asset.
    pub policy: Policy,
}

impl ContractOffer {
    pub fn new(id: &str, asset_id: &str, policy: Policy) -> Self {
        Self {
            id: id.to_string(),
            asset_id: asset_id.to_string(),
            policy,
        }
    }
}

/// The agreement sealed by a successful negotiation.
///
/// Set exactly once on the negotiation when the agreeing step succeeds and
/// immutable from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAgreement {
    pub id: String,
    pub provider_id: String,
    pub consumer_id: String,

    /// Signing time, epoch milliseconds.
    pub signing_date: i64,

    pub asset_id: String,
    pub policy: Policy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_builder() {
        let policy = Policy::new()
            .with_target("asset-1")
            .with_assigner("provider")
            .with_assignee("consumer")
            .with_rule(Rule::new("use").with_constraint(Constraint::new("region", "eq", "EU")));

        assert_eq!(policy.target.as_deref(), Some("asset-1"));
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.rules[0].constraints[0].operator, "eq");
    }

    #[test]
    fn test_offer_serde_round_trip() {
        let offer = ContractOffer::new("offer-1", "asset-1", Policy::new().with_target("asset-1"));
        let json = serde_json::to_string(&offer).unwrap();
        let back: ContractOffer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, offer);
    }
}
