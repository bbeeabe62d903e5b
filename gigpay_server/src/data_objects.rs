use std::fmt::Display;

use gigpay_common::MoneyCents;
use gigpay_engine::db_types::{Contract, ContractStatus, Payment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body for routes that only need to know which provider moves the money.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySelection {
    pub gateway: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitWorkRequest {
    /// Hours actually worked, for hourly contracts.
    #[serde(default)]
    pub actual_hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveCompletionRequest {
    pub gateway: String,
    /// The tasker's account at the provider, the destination for the payout.
    pub destination_account: String,
}

/// Who is recorded as having cancelled the contract. The server checks that the acting user matches the party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationParty {
    Provider,
    Tasker,
    Mutual,
}

impl CancellationParty {
    pub fn contract_status(&self) -> ContractStatus {
        match self {
            CancellationParty::Provider => ContractStatus::CancelledByProvider,
            CancellationParty::Tasker => ContractStatus::CancelledByTasker,
            CancellationParty::Mutual => ContractStatus::CancelledMutual,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub cancelled_by: CancellationParty,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: MoneyCents,
    pub gateway: String,
    /// The account at the provider that receives the funds.
    pub provider_account_id: String,
}

/// Response shape for operations that move a contract and a payment together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractWithPayment {
    pub contract: Contract,
    pub payment: Payment,
}
