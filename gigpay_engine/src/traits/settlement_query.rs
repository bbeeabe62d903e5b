use thiserror::Error;

use crate::{
    db_types::{Contract, Payment},
    traits::DashboardSummary,
};

#[derive(Debug, Clone, Error)]
pub enum SettlementQueryError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for SettlementQueryError {
    fn from(e: sqlx::Error) -> Self {
        SettlementQueryError::DatabaseError(e.to_string())
    }
}

/// Read-only access to settlement records.
#[allow(async_fn_in_trait)]
pub trait SettlementQuery {
    async fn fetch_contract(&self, contract_id: i64) -> Result<Option<Contract>, SettlementQueryError>;

    /// The (at most one) non-terminal contract for a gig.
    async fn fetch_active_contract_for_gig(&self, gig_id: &str) -> Result<Option<Contract>, SettlementQueryError>;

    /// All contracts where the user is either party, newest first.
    async fn fetch_contracts_for_user(&self, user_id: &str) -> Result<Vec<Contract>, SettlementQueryError>;

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, SettlementQueryError>;

    /// Looks a payment up by any of its gateway identifiers (intent, payout, refund or transfer id). This is the
    /// reconciliation path for inbound webhooks.
    async fn fetch_payment_by_external_id(&self, external_id: &str) -> Result<Option<Payment>, SettlementQueryError>;

    /// Payments referencing the contract, oldest first.
    async fn fetch_payments_for_contract(&self, contract_id: i64) -> Result<Vec<Payment>, SettlementQueryError>;

    /// Money summary for the user's dashboard.
    async fn dashboard_summary(&self, user_id: &str) -> Result<DashboardSummary, SettlementQueryError>;
}
