//! `SqliteDatabase` is a concrete implementation of a settlement engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Individual statements live in [`super::db`]; this module composes them into transactions so that every
//! write method is atomic.
use std::fmt::Debug;

use gigpay_common::FeeBreakdown;
use log::*;
use sqlx::SqlitePool;

use super::db::{audit, contracts, db_url, new_pool, payments};
use crate::{
    db_types::{Contract, ContractPaymentStatus, ContractStatus, NewContract, NewPayment, Payment, PaymentStatus},
    traits::{
        DashboardSummary,
        SettledPayment,
        SettlementDatabase,
        SettlementDatabaseError,
        SettlementQuery,
        SettlementQueryError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SettlementQuery for SqliteDatabase {
    async fn fetch_contract(&self, contract_id: i64) -> Result<Option<Contract>, SettlementQueryError> {
        let mut conn = self.pool.acquire().await?;
        let contract = contracts::fetch_contract(contract_id, &mut conn).await?;
        Ok(contract)
    }

    async fn fetch_active_contract_for_gig(&self, gig_id: &str) -> Result<Option<Contract>, SettlementQueryError> {
        let mut conn = self.pool.acquire().await?;
        let contract = contracts::fetch_active_for_gig(gig_id, &mut conn).await?;
        Ok(contract)
    }

    async fn fetch_contracts_for_user(&self, user_id: &str) -> Result<Vec<Contract>, SettlementQueryError> {
        let mut conn = self.pool.acquire().await?;
        let contracts = contracts::fetch_for_user(user_id, &mut conn).await?;
        Ok(contracts)
    }

    async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, SettlementQueryError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_external_id(&self, external_id: &str) -> Result<Option<Payment>, SettlementQueryError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_by_external_id(external_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payments_for_contract(&self, contract_id: i64) -> Result<Vec<Payment>, SettlementQueryError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_for_contract(contract_id, &mut conn).await?;
        Ok(payments)
    }

    async fn dashboard_summary(&self, user_id: &str) -> Result<DashboardSummary, SettlementQueryError> {
        let mut conn = self.pool.acquire().await?;
        let total_earned = payments::total_earned(user_id, &mut conn).await?;
        let pending_earnings = payments::pending_earnings(user_id, &mut conn).await?;
        let total_spent = payments::total_spent(user_id, &mut conn).await?;
        let fees_paid = payments::fees_paid(user_id, &mut conn).await?;
        let total_withdrawn = payments::total_withdrawn(user_id, &mut conn).await?;
        let (open_contracts, completed_contracts) = contracts::contract_counts(user_id, &mut conn).await?;
        Ok(DashboardSummary {
            user_id: user_id.to_string(),
            total_earned,
            pending_earnings,
            total_spent,
            fees_paid,
            total_withdrawn,
            open_contracts,
            completed_contracts,
        })
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Inserts the contract and advances it to `PendingPayment` in one transaction, so `PendingAcceptance` is never
    /// visible to other readers. If the gig already has a live contract, that contract is returned with `false` and
    /// nothing is written.
    async fn create_accepted_contract(
        &self,
        offer: NewContract,
        ledger: FeeBreakdown,
    ) -> Result<(Contract, bool), SettlementDatabaseError> {
        let mut tx = self.pool.begin().await?;
        if let Some(existing) = contracts::fetch_active_for_gig(&offer.gig_id, &mut tx).await? {
            debug!("🗃️📋️ Gig {} already has live contract #{}. Returning it.", offer.gig_id, existing.id);
            return Ok((existing, false));
        }
        let contract = contracts::insert_contract(offer, &ledger, &mut tx).await?;
        let contract = contracts::transition(
            contract.id,
            &[ContractStatus::PendingAcceptance],
            ContractStatus::PendingPayment,
            None,
            &mut tx,
        )
        .await?
        .ok_or(SettlementDatabaseError::ContractNotFound(contract.id))?;
        audit::contract_transition(contract.id, "pending_acceptance", "pending_payment", None, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️📋️ Contract #{} created for gig {} at {}", contract.id, contract.gig_id, contract.service_amount);
        Ok((contract, true))
    }

    async fn transition_contract(
        &self,
        contract_id: i64,
        expected: &[ContractStatus],
        new_status: ContractStatus,
        reason: Option<String>,
    ) -> Result<Contract, SettlementDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let before = contracts::fetch_contract(contract_id, &mut tx)
            .await?
            .ok_or(SettlementDatabaseError::ContractNotFound(contract_id))?;
        let Some(contract) =
            contracts::transition(contract_id, expected, new_status, reason.as_deref(), &mut tx).await?
        else {
            // Lost the compare-and-set. `before` may already be stale, but its status still explains the refusal.
            return Err(SettlementDatabaseError::ContractConflict {
                id: contract_id,
                current: before.status,
                requested: new_status,
                contract: Box::new(before),
            });
        };
        audit::contract_transition(
            contract_id,
            &before.status.to_string(),
            &new_status.to_string(),
            reason.as_deref(),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        Ok(contract)
    }

    async fn record_actual_hours(&self, contract_id: i64, hours: i64) -> Result<Contract, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let Some(contract) = contracts::set_actual_hours(contract_id, hours, &mut conn).await? else {
            let current = contracts::fetch_contract(contract_id, &mut conn)
                .await?
                .ok_or(SettlementDatabaseError::ContractNotFound(contract_id))?;
            return Err(SettlementDatabaseError::ContractConflict {
                id: contract_id,
                current: current.status,
                requested: current.status,
                contract: Box::new(current),
            });
        };
        Ok(contract)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, SettlementDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::insert_payment(payment, &mut tx).await?;
        audit::insert_audit_row(
            "payment",
            &payment.id.to_string(),
            "created",
            Some(serde_json::json!({
                "type": payment.payment_type.to_string(),
                "amount": payment.amount,
                "total_provider_payment": payment.total_provider_payment,
                "gateway": payment.gateway,
            })),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn attach_payment_intent(
        &self,
        payment_id: i64,
        intent_id: &str,
    ) -> Result<Payment, SettlementDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let Some(payment) = payments::attach_intent(payment_id, intent_id, &mut tx).await? else {
            let current = payments::fetch_payment(payment_id, &mut tx)
                .await?
                .ok_or(SettlementDatabaseError::PaymentNotFound(payment_id))?;
            // Re-delivery of the same intent id is harmless.
            if current.intent_id.as_deref() == Some(intent_id) {
                return Ok(current);
            }
            if current.intent_id.is_some() {
                return Err(SettlementDatabaseError::ExternalIdAlreadyAttached { payment_id, field: "intent_id" });
            }
            return Err(SettlementDatabaseError::PaymentStatusConflict {
                id: payment_id,
                current: current.status,
                requested: PaymentStatus::Processing,
                payment: Box::new(current),
            });
        };
        audit::payment_transition(payment_id, "pending", "processing", &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️💳️ Payment #{payment_id} has intent {intent_id} attached");
        Ok(payment)
    }

    async fn attach_refund(&self, payment_id: i64, refund_id: &str) -> Result<Payment, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let Some(payment) = payments::attach_refund(payment_id, refund_id, &mut conn).await? else {
            let current = payments::fetch_payment(payment_id, &mut conn)
                .await?
                .ok_or(SettlementDatabaseError::PaymentNotFound(payment_id))?;
            if current.refund_id.as_deref() == Some(refund_id) {
                return Ok(current);
            }
            return Err(SettlementDatabaseError::ExternalIdAlreadyAttached { payment_id, field: "refund_id" });
        };
        debug!("🗃️💳️ Payment #{payment_id} has refund {refund_id} attached");
        Ok(payment)
    }

    async fn claim_payout(&self, payment_id: i64, payout_id: &str) -> Result<Payment, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let Some(payment) = payments::claim_payout(payment_id, payout_id, &mut conn).await? else {
            let current = payments::fetch_payment(payment_id, &mut conn)
                .await?
                .ok_or(SettlementDatabaseError::PaymentNotFound(payment_id))?;
            return Err(SettlementDatabaseError::PayoutAlreadyClaimed(payment_id, Box::new(current)));
        };
        debug!("🗃️🏦️ Payment #{payment_id} claimed payout slot {payout_id}");
        Ok(payment)
    }

    async fn mark_payment_failed(&self, payment_id: i64) -> Result<Payment, SettlementDatabaseError> {
        let settled = self.settle_payment(payment_id, PaymentStatus::Failed).await?;
        Ok(settled.payment)
    }

    async fn settle_payment(
        &self,
        payment_id: i64,
        new_status: PaymentStatus,
    ) -> Result<SettledPayment, SettlementDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let before = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or(SettlementDatabaseError::PaymentNotFound(payment_id))?;
        if before.status == new_status {
            let contract = match before.contract_id {
                Some(cid) => contracts::fetch_contract(cid, &mut tx).await?,
                None => None,
            };
            debug!("🗃️💳️ Payment #{payment_id} is already '{new_status}'. Nothing to do.");
            return Ok(SettledPayment { payment: before, contract, applied: false });
        }
        let expected = PaymentStatus::legal_sources(new_status);
        let Some(payment) = payments::update_status(payment_id, &expected, new_status, &mut tx).await? else {
            return Err(SettlementDatabaseError::PaymentStatusConflict {
                id: payment_id,
                current: before.status,
                requested: new_status,
                payment: Box::new(before),
            });
        };
        audit::payment_transition(payment_id, &before.status.to_string(), &new_status.to_string(), &mut tx).await?;
        let contract = match payment.contract_id {
            Some(contract_id) => {
                self.advance_funded_contract(contract_id, new_status, &mut tx).await?
            },
            None => None,
        };
        tx.commit().await?;
        Ok(SettledPayment { payment, contract, applied: true })
    }

    async fn record_anomaly(
        &self,
        external_id: &str,
        gateway: &str,
        detail: &str,
    ) -> Result<(), SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        audit::reconciliation_anomaly(external_id, gateway, detail, &mut conn).await?;
        warn!("🗃️⚠️ Reconciliation anomaly for {gateway} event {external_id}: {detail}");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SettlementDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Moves the funded contract along when its payment settles. Runs inside the caller's transaction.
    ///
    /// Success makes the contract `Active`/`Paid`; failure and refund only touch the funding status. The contract
    /// transition is compare-and-set against `PendingPayment`, so a late success event for an already-active (or
    /// cancelled) contract updates nothing.
    async fn advance_funded_contract(
        &self,
        contract_id: i64,
        payment_status: PaymentStatus,
        tx: &mut sqlx::SqliteConnection,
    ) -> Result<Option<Contract>, SettlementDatabaseError> {
        use ContractPaymentStatus as Cps;
        let contract = match payment_status {
            PaymentStatus::Succeeded => {
                let contract =
                    contracts::transition(contract_id, &[ContractStatus::PendingPayment], ContractStatus::Active, None, tx)
                        .await?;
                if contract.is_some() {
                    audit::contract_transition(contract_id, "pending_payment", "active", None, tx).await?;
                }
                contracts::set_payment_status(contract_id, &[Cps::Pending], Cps::Paid, tx).await?.or(contract)
            },
            PaymentStatus::Failed => contracts::set_payment_status(contract_id, &[Cps::Pending], Cps::Failed, tx).await?,
            PaymentStatus::Refunded => contracts::set_payment_status(contract_id, &[Cps::Paid], Cps::Refunded, tx).await?,
            PaymentStatus::Pending | PaymentStatus::Processing => None,
        };
        match contract {
            Some(c) => Ok(Some(c)),
            // The guarded update may have been a no-op; the caller still wants the current record.
            None => Ok(contracts::fetch_contract(contract_id, tx).await?),
        }
    }
}
