// model/mod.rs - Control Plane Entities

//! Entities and value objects of the control plane: negotiations, transfer
//! processes, offers, agreements, policies and data addresses.

mod contract;
mod data_address;
mod negotiation;
mod transfer;

pub use contract::{Constraint, ContractAgreement, ContractOffer, Policy, Rule};
pub use data_address::{DataAddress, SECRET_PROPERTY};
pub use negotiation::{Negotiation, NegotiationState};
pub use transfer::{TransferProcess, TransferState};
