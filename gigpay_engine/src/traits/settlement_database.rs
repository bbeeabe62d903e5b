use gigpay_common::FeeBreakdown;
use thiserror::Error;

use crate::{
    db_types::{Contract, ContractPaymentStatus, ContractStatus, NewContract, NewPayment, Payment, PaymentStatus},
    traits::{SettledPayment, SettlementQuery, SettlementQueryError},
};

/// The highest level of behaviour a settlement backend must provide.
///
/// Every method with write semantics is atomic: the record mutation, any dependent contract/payment update and the
/// audit row are committed in a single database transaction. Transitions are compare-and-set against the *persisted*
/// state, so a caller holding a stale in-memory record loses cleanly with a conflict instead of clobbering a
/// concurrent writer.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone + SettlementQuery {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Creates the contract for an accepted offer, with the ledger snapshot already computed by the fee calculator.
    ///
    /// The contract is created in `PendingAcceptance` and advanced to `PendingPayment` in the same transaction,
    /// stamping `accepted_at`. The call is idempotent per gig: if a non-terminal contract for the gig already
    /// exists, it is returned with `false` in the second element and nothing is written.
    async fn create_accepted_contract(
        &self,
        offer: NewContract,
        ledger: FeeBreakdown,
    ) -> Result<(Contract, bool), SettlementDatabaseError>;

    /// Compare-and-set contract transition.
    ///
    /// Applies `new_status` only if the persisted status is one of `expected`, stamping the state's set-once
    /// timestamp and writing an audit row. If the persisted status is not in `expected`, the current record is
    /// re-fetched and returned inside [`SettlementDatabaseError::ContractConflict`] so the caller can distinguish
    /// idempotent re-entry from a genuine illegal transition.
    async fn transition_contract(
        &self,
        contract_id: i64,
        expected: &[ContractStatus],
        new_status: ContractStatus,
        reason: Option<String>,
    ) -> Result<Contract, SettlementDatabaseError>;

    /// Records the hours actually worked on a non-terminal contract.
    async fn record_actual_hours(&self, contract_id: i64, hours: i64) -> Result<Contract, SettlementDatabaseError>;

    /// Inserts a new payment record in `Pending` status, carrying its fee breakdown as immutable ledger fields.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, SettlementDatabaseError>;

    /// Records the gateway's intent id on a pending payment and moves it to `Processing`. The intent id is unique;
    /// attaching to a payment that is no longer `Pending` is a conflict.
    async fn attach_payment_intent(&self, payment_id: i64, intent_id: &str)
        -> Result<Payment, SettlementDatabaseError>;

    /// Records the gateway's refund id. Idempotent: if the same refund id is already attached the record is
    /// returned unchanged; a *different* refund id is a conflict.
    async fn attach_refund(&self, payment_id: i64, refund_id: &str) -> Result<Payment, SettlementDatabaseError>;

    /// Claims the payout slot on a payment record, exactly once.
    ///
    /// The update only succeeds while `payout_id` is NULL, so of two racing approvals precisely one performs the
    /// payout; the loser receives [`SettlementDatabaseError::PayoutAlreadyClaimed`] with the existing record and
    /// must not create another payout.
    async fn claim_payout(&self, payment_id: i64, payout_id: &str) -> Result<Payment, SettlementDatabaseError>;

    /// Marks a payment as failed before it ever reached the gateway (e.g. the create-intent call itself failed).
    async fn mark_payment_failed(&self, payment_id: i64) -> Result<Payment, SettlementDatabaseError>;

    /// Applies a settlement status to a payment and advances the owning contract, atomically.
    ///
    /// The payment update is compare-and-set against [`PaymentStatus::legal_sources`]; `succeeded_at`/`refunded_at`
    /// are stamped once. On success of a contract payment the contract moves `PendingPayment -> Active` and its
    /// payment status becomes `Paid`; failure and refund update the contract's payment status without reverting its
    /// lifecycle state. If the record is already in `new_status`, the call is a duplicate:
    /// `SettledPayment::applied` is false and nothing is written. Any other precondition failure is a
    /// [`SettlementDatabaseError::PaymentStatusConflict`].
    async fn settle_payment(
        &self,
        payment_id: i64,
        new_status: PaymentStatus,
    ) -> Result<SettledPayment, SettlementDatabaseError>;

    /// Records a reconciliation anomaly in the audit log for operator follow-up. Never fails the webhook that
    /// reported it; database errors here are returned so the caller can log them.
    async fn record_anomaly(
        &self,
        external_id: &str,
        gateway: &str,
        detail: &str,
    ) -> Result<(), SettlementDatabaseError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), SettlementDatabaseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementDatabaseError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Contract {0} does not exist")]
    ContractNotFound(i64),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(i64),
    #[error("Contract {id} is '{current}', cannot move to '{requested}'")]
    ContractConflict { id: i64, current: ContractStatus, requested: ContractStatus, contract: Box<Contract> },
    #[error("Payment {id} is '{current}', cannot move to '{requested}'")]
    PaymentStatusConflict { id: i64, current: PaymentStatus, requested: PaymentStatus, payment: Box<Payment> },
    #[error("Payment {0} already has a payout attached")]
    PayoutAlreadyClaimed(i64, Box<Payment>),
    #[error("Payment {payment_id} already has {field} attached")]
    ExternalIdAlreadyAttached { payment_id: i64, field: &'static str },
    #[error("Contract {id} payment status is '{current}', expected '{expected}'")]
    ContractPaymentStatusConflict { id: i64, current: ContractPaymentStatus, expected: ContractPaymentStatus },
}

impl From<sqlx::Error> for SettlementDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        SettlementDatabaseError::DatabaseError(e.to_string())
    }
}

impl From<SettlementQueryError> for SettlementDatabaseError {
    fn from(e: SettlementQueryError) -> Self {
        match e {
            SettlementQueryError::DatabaseError(msg) => SettlementDatabaseError::DatabaseError(msg),
        }
    }
}
