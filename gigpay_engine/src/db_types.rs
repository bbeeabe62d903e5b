//! Record types for the settlement database, plus the pure transition rules of the contract and payment state
//! machines.
//!
//! The legality of a transition is decided here, by [`ContractStatus::can_transition_to`] and
//! [`PaymentStatus::can_transition_to`]; the SQLite layer enforces the same rules with compare-and-set updates so
//! that two racing writers cannot both win. Nothing outside the backend traits mutates these records field by field.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use gateway_tools::types::GatewayPaymentStatus;
use gigpay_common::{FeeBreakdown, MoneyCents};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------    ContractStatus    --------------------------------------------------------
/// The contract lifecycle.
///
/// `PendingAcceptance` exists only transiently: accepting an offer creates the contract and advances it to
/// `PendingPayment` in the same transaction, so it is never observable between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    PendingAcceptance,
    PendingPayment,
    Active,
    Submitted,
    Approved,
    Completed,
    CancelledByProvider,
    CancelledByTasker,
    CancelledMutual,
}

impl ContractStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Completed) || self.is_cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ContractStatus::CancelledByProvider | ContractStatus::CancelledByTasker | ContractStatus::CancelledMutual
        )
    }

    /// The forward edges of the state machine. Cancellation is legal from any non-terminal, observable state;
    /// everything else moves along the single main path, with `Submitted -> Active` as the revision loop.
    pub fn can_transition_to(&self, new: ContractStatus) -> bool {
        use ContractStatus::*;
        if new.is_cancelled() {
            return matches!(self, PendingPayment | Active | Submitted);
        }
        matches!(
            (self, new),
            (PendingAcceptance, PendingPayment)
                | (PendingPayment, Active)
                | (Active, Submitted)
                | (Submitted, Approved)
                | (Submitted, Active)
                | (Approved, Completed)
        )
    }

    /// The set-once timestamp column recorded when a contract first enters this state, if any.
    pub fn timestamp_column(&self) -> Option<&'static str> {
        use ContractStatus::*;
        match self {
            PendingPayment => Some("accepted_at"),
            Submitted => Some("work_submitted_at"),
            Approved => Some("approved_at"),
            Completed => Some("completed_at"),
            CancelledByProvider | CancelledByTasker | CancelledMutual => Some("cancelled_at"),
            PendingAcceptance | Active => None,
        }
    }
}

impl Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContractStatus::PendingAcceptance => "pending_acceptance",
            ContractStatus::PendingPayment => "pending_payment",
            ContractStatus::Active => "active",
            ContractStatus::Submitted => "submitted",
            ContractStatus::Approved => "approved",
            ContractStatus::Completed => "completed",
            ContractStatus::CancelledByProvider => "cancelled_by_provider",
            ContractStatus::CancelledByTasker => "cancelled_by_tasker",
            ContractStatus::CancelledMutual => "cancelled_mutual",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ContractStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_acceptance" => Ok(Self::PendingAcceptance),
            "pending_payment" => Ok(Self::PendingPayment),
            "active" => Ok(Self::Active),
            "submitted" => Ok(Self::Submitted),
            "approved" => Ok(Self::Approved),
            "completed" => Ok(Self::Completed),
            "cancelled_by_provider" => Ok(Self::CancelledByProvider),
            "cancelled_by_tasker" => Ok(Self::CancelledByTasker),
            "cancelled_mutual" => Ok(Self::CancelledMutual),
            s => Err(ConversionError(format!("Invalid contract status: {s}"))),
        }
    }
}

//----------------------------------   ContractPaymentStatus   -------------------------------------------------------
/// The contract's view of its funding. `Paid` is only ever set alongside a `Succeeded` payment record referencing
/// the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractPaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Display for ContractPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContractPaymentStatus::Pending => "pending",
            ContractPaymentStatus::Paid => "paid",
            ContractPaymentStatus::Failed => "failed",
            ContractPaymentStatus::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------     PricingMode      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    Fixed,
    Hourly,
}

//--------------------------------------       Contract       --------------------------------------------------------
/// One job engagement between a provider (the paying party who posted the gig) and a tasker (the payee performing
/// it). The ledger fields are a snapshot of the fee calculation made at acceptance time, so the numbers the payer
/// agreed to cannot drift if the platform's fee schedule changes later.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    pub gig_id: String,
    pub provider_id: String,
    pub tasker_id: String,
    pub pricing_mode: PricingMode,
    /// The price per hour for hourly contracts. For fixed-price contracts this column carries the agreed fixed
    /// price instead; `pricing_mode` disambiguates, and `service_amount` is the derived value either way.
    pub hourly_rate: Option<MoneyCents>,
    pub estimated_hours: Option<i64>,
    pub actual_hours: Option<i64>,
    /// The agreed service amount: the fixed price, or rate × estimated hours.
    pub service_amount: MoneyCents,
    pub currency: String,
    pub status: ContractStatus,
    pub payment_status: ContractPaymentStatus,
    pub fee_amount: MoneyCents,
    pub tax_amount: MoneyCents,
    pub payout_amount: MoneyCents,
    pub accepted_at: Option<DateTime<Utc>>,
    pub work_submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewContract      --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContract {
    pub gig_id: String,
    pub provider_id: String,
    pub tasker_id: String,
    pub pricing_mode: PricingMode,
    /// Rate per hour, or the fixed price when `pricing_mode` is [`PricingMode::Fixed`]. See [`Contract::hourly_rate`].
    pub hourly_rate: Option<MoneyCents>,
    pub estimated_hours: Option<i64>,
    pub currency: String,
}

impl NewContract {
    pub fn fixed_price(gig_id: &str, provider_id: &str, tasker_id: &str, price: MoneyCents) -> Self {
        Self {
            gig_id: gig_id.to_string(),
            provider_id: provider_id.to_string(),
            tasker_id: tasker_id.to_string(),
            pricing_mode: PricingMode::Fixed,
            hourly_rate: Some(price),
            estimated_hours: None,
            currency: "usd".to_string(),
        }
    }

    pub fn hourly(gig_id: &str, provider_id: &str, tasker_id: &str, rate: MoneyCents, estimated_hours: i64) -> Self {
        Self {
            gig_id: gig_id.to_string(),
            provider_id: provider_id.to_string(),
            tasker_id: tasker_id.to_string(),
            pricing_mode: PricingMode::Hourly,
            hourly_rate: Some(rate),
            estimated_hours: Some(estimated_hours),
            currency: "usd".to_string(),
        }
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    /// The agreed service amount for this engagement.
    pub fn service_amount(&self) -> MoneyCents {
        match self.pricing_mode {
            PricingMode::Fixed => self.hourly_rate.unwrap_or_default(),
            PricingMode::Hourly => {
                self.hourly_rate.unwrap_or_default() * self.estimated_hours.unwrap_or_default()
            },
        }
    }
}

//--------------------------------------    PaymentStatus     --------------------------------------------------------
/// The lifecycle of one money movement. Transitions are monotone: once a payment has succeeded it can only move to
/// `Refunded`, and `Failed`/`Refunded` are dead ends. A "failed" webhook arriving after success is an anomaly, never
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Failed | PaymentStatus::Refunded)
    }

    pub fn can_transition_to(&self, new: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, new),
            (Pending, Processing)
                | (Pending, Succeeded)
                | (Pending, Failed)
                | (Processing, Succeeded)
                | (Processing, Failed)
                | (Succeeded, Refunded)
        )
    }

    /// Every status that is allowed to move to `new`. This is what the compare-and-set UPDATE matches against.
    pub fn legal_sources(new: PaymentStatus) -> Vec<PaymentStatus> {
        use PaymentStatus::*;
        [Pending, Processing, Succeeded, Failed, Refunded]
            .into_iter()
            .filter(|s| s.can_transition_to(new))
            .collect()
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

impl From<GatewayPaymentStatus> for PaymentStatus {
    fn from(status: GatewayPaymentStatus) -> Self {
        match status {
            GatewayPaymentStatus::Pending => PaymentStatus::Pending,
            GatewayPaymentStatus::Processing => PaymentStatus::Processing,
            GatewayPaymentStatus::Succeeded => PaymentStatus::Succeeded,
            GatewayPaymentStatus::Failed => PaymentStatus::Failed,
            GatewayPaymentStatus::Refunded => PaymentStatus::Refunded,
        }
    }
}

//--------------------------------------     PaymentType      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// A contract payment: the provider's charge, and later the payout to the tasker, on one record.
    Payment,
    /// A standalone withdrawal of a tasker's balance. No contract reference, no fee, no tax.
    Withdrawal,
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Payment => write!(f, "payment"),
            PaymentType::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

//--------------------------------------       Payment        --------------------------------------------------------
/// One money movement, immutable once settled.
///
/// The ledger invariant `amount_received_by_payee + application_fee_amount + provider_tax_amount ==
/// total_provider_payment` holds exactly, in integer cents, for every record. The external identifiers are unique
/// when present; they are the idempotency keys webhook reconciliation matches on.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub payment_type: PaymentType,
    pub contract_id: Option<i64>,
    pub payer_id: String,
    pub payee_id: String,
    pub currency: String,
    /// The requested service amount (or withdrawal amount), before fee and tax.
    pub amount: MoneyCents,
    pub application_fee_amount: MoneyCents,
    pub provider_tax_amount: MoneyCents,
    pub tasker_tax_amount: MoneyCents,
    pub total_provider_payment: MoneyCents,
    pub amount_received_by_payee: MoneyCents,
    pub gateway: String,
    pub intent_id: Option<String>,
    pub payout_id: Option<String>,
    pub refund_id: Option<String>,
    pub transfer_id: Option<String>,
    pub provider_account_id: Option<String>,
    pub status: PaymentStatus,
    pub succeeded_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// The ledger balance check from the fee calculator, applied to a stored record.
    pub fn ledger_balances(&self) -> bool {
        self.amount_received_by_payee + self.application_fee_amount + self.provider_tax_amount
            == self.total_provider_payment
    }
}

//--------------------------------------      NewPayment      --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub payment_type: PaymentType,
    pub contract_id: Option<i64>,
    pub payer_id: String,
    pub payee_id: String,
    pub currency: String,
    pub amount: MoneyCents,
    pub breakdown: FeeBreakdown,
    pub gateway: String,
    pub provider_account_id: Option<String>,
}

impl NewPayment {
    /// The charge for a contract, carrying the ledger snapshot taken when the offer was accepted.
    pub fn for_contract(contract: &Contract, breakdown: FeeBreakdown, gateway: &str) -> Self {
        Self {
            payment_type: PaymentType::Payment,
            contract_id: Some(contract.id),
            payer_id: contract.provider_id.clone(),
            payee_id: contract.tasker_id.clone(),
            currency: contract.currency.clone(),
            amount: contract.service_amount,
            breakdown,
            gateway: gateway.to_string(),
            provider_account_id: None,
        }
    }

    /// A standalone withdrawal: fees and tax are zero by construction.
    pub fn withdrawal(user_id: &str, amount: MoneyCents, gateway: &str, provider_account_id: &str) -> Self {
        Self {
            payment_type: PaymentType::Withdrawal,
            contract_id: None,
            payer_id: user_id.to_string(),
            payee_id: user_id.to_string(),
            currency: "usd".to_string(),
            amount,
            breakdown: FeeBreakdown::withdrawal(amount),
            gateway: gateway.to_string(),
            provider_account_id: Some(provider_account_id.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn main_path_transitions_are_legal() {
        use ContractStatus::*;
        assert!(PendingAcceptance.can_transition_to(PendingPayment));
        assert!(PendingPayment.can_transition_to(Active));
        assert!(Active.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Completed));
        // revision loop
        assert!(Submitted.can_transition_to(Active));
    }

    #[test]
    fn no_skipping_or_back_transitions() {
        use ContractStatus::*;
        assert!(!PendingPayment.can_transition_to(Submitted));
        assert!(!PendingPayment.can_transition_to(Completed));
        assert!(!Active.can_transition_to(Approved));
        assert!(!Submitted.can_transition_to(Completed));
        assert!(!Active.can_transition_to(PendingPayment));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Approved.can_transition_to(Submitted));
    }

    #[test]
    fn cancellation_reaches_only_non_terminal_states() {
        use ContractStatus::*;
        for cancelled in [CancelledByProvider, CancelledByTasker, CancelledMutual] {
            assert!(PendingPayment.can_transition_to(cancelled));
            assert!(Active.can_transition_to(cancelled));
            assert!(Submitted.can_transition_to(cancelled));
            assert!(!Completed.can_transition_to(cancelled));
            assert!(!CancelledMutual.can_transition_to(cancelled));
            // approval has already committed to the payout; cancellation is no longer an exit
            assert!(!Approved.can_transition_to(cancelled));
        }
    }

    #[test]
    fn terminal_states_are_terminal() {
        use ContractStatus::*;
        for status in [Completed, CancelledByProvider, CancelledByTasker, CancelledMutual] {
            assert!(status.is_terminal());
        }
        for status in [PendingAcceptance, PendingPayment, Active, Submitted, Approved] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn payment_transitions_are_monotone() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Succeeded));
        assert!(Processing.can_transition_to(Failed));
        assert!(Succeeded.can_transition_to(Refunded));
        // the anomaly cases: settled funds never revert on a status event
        assert!(!Succeeded.can_transition_to(Failed));
        assert!(!Succeeded.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Succeeded));
        assert!(!Refunded.can_transition_to(Succeeded));
    }

    #[test]
    fn legal_sources_match_transition_table() {
        use PaymentStatus::*;
        assert_eq!(PaymentStatus::legal_sources(Succeeded), vec![Pending, Processing]);
        assert_eq!(PaymentStatus::legal_sources(Refunded), vec![Succeeded]);
        assert_eq!(PaymentStatus::legal_sources(Failed), vec![Pending, Processing]);
    }

    #[test]
    fn hourly_contract_service_amount() {
        let offer = NewContract::hourly("gig-1", "prov-1", "task-1", MoneyCents::from(2_500), 8);
        assert_eq!(offer.service_amount(), MoneyCents::from(20_000));
        let fixed = NewContract::fixed_price("gig-2", "prov-1", "task-1", MoneyCents::from(10_000));
        assert_eq!(fixed.service_amount(), MoneyCents::from(10_000));
    }
}
