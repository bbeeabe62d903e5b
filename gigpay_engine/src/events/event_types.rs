use serde::{Deserialize, Serialize};

use crate::db_types::{Contract, ContractStatus, Payment};

/// Fired whenever a contract changes lifecycle state, including cancellations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTransitionedEvent {
    pub old_status: ContractStatus,
    pub contract: Contract,
}

impl ContractTransitionedEvent {
    pub fn new(old_status: ContractStatus, contract: Contract) -> Self {
        Self { old_status, contract }
    }
}

/// Fired when a webhook event settles a payment record (success, failure or refund). Duplicates never fire this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub payment: Payment,
    /// The contract the payment funds, if any, as of the same transaction.
    pub contract: Option<Contract>,
}

impl PaymentSettledEvent {
    pub fn new(payment: Payment, contract: Option<Contract>) -> Self {
        Self { payment, contract }
    }
}

/// Fired when a payout has been created at the gateway and its id claimed on the payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutCreatedEvent {
    pub payment: Payment,
}

impl PayoutCreatedEvent {
    pub fn new(payment: Payment) -> Self {
        Self { payment }
    }
}

/// Fired when an inbound webhook does not reconcile: unknown external id, or a status regression that was recorded
/// but not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAnomalyEvent {
    pub gateway: String,
    pub external_id: String,
    pub detail: String,
}

impl WebhookAnomalyEvent {
    pub fn new(gateway: &str, external_id: &str, detail: &str) -> Self {
        Self { gateway: gateway.to_string(), external_id: external_id.to_string(), detail: detail.to_string() }
    }
}
