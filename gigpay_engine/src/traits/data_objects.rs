use gigpay_common::MoneyCents;
use serde::{Deserialize, Serialize};

use crate::db_types::{Contract, Payment};

/// The result of applying a webhook event to a payment record.
///
/// `applied` is false when the event turned out to be a duplicate at write time (a racing writer got there first);
/// callers acknowledge duplicates without emitting settlement events a second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledPayment {
    pub payment: Payment,
    /// The contract advanced alongside the payment, when the payment funds one.
    pub contract: Option<Contract>,
    pub applied: bool,
}

/// Per-user money summary for client display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub user_id: String,
    /// Settled earnings as a payee, over completed contract payments.
    pub total_earned: MoneyCents,
    /// Earnings on contracts that are funded but not yet paid out.
    pub pending_earnings: MoneyCents,
    /// Total charged as a payer, including fee and tax.
    pub total_spent: MoneyCents,
    /// Platform fees paid as a payer.
    pub fees_paid: MoneyCents,
    /// Settled withdrawals as a payee.
    pub total_withdrawn: MoneyCents,
    pub open_contracts: i64,
    pub completed_contracts: i64,
}
