use std::fmt::Debug;

use gateway_tools::{
    types::{PaymentIntentRequest, PayoutRequest, WebhookEvent},
    GatewayAdapter,
};
use gigpay_common::{FeeBreakdown, FeeSchedule, MoneyCents};
use log::*;

use crate::{
    db_types::{Contract, ContractStatus, NewContract, NewPayment, Payment, PaymentStatus, PaymentType},
    events::{ContractTransitionedEvent, EventProducers, PaymentSettledEvent, PayoutCreatedEvent, WebhookAnomalyEvent},
    settlement_api::SettlementError,
    traits::{DashboardSummary, SettledPayment, SettlementDatabase, SettlementDatabaseError},
};

/// `SettlementApi` is the primary API for moving contracts and money in response to marketplace actions and payment
/// provider webhook events.
///
/// Gateway-facing operations are generic over the adapter at the method level, so callers decide per call which
/// provider handles the money movement. The gateway call always happens *outside* the database transaction; a call
/// that fails after the gateway succeeded leaves the record in a retryable state rather than losing it.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
    fee_schedule: FeeSchedule,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers, fee_schedule: FeeSchedule) -> Self {
        Self { db, producers, fee_schedule }
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        self.fee_schedule
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> SettlementApi<B>
where B: SettlementDatabase
{
    /// A tasker accepts an offer on a gig.
    ///
    /// Computes the ledger snapshot for the agreed amount and creates the contract in `PendingPayment`. Idempotent
    /// per gig: if the gig already has a live contract, it is returned with `false` and nothing changes.
    pub async fn accept_offer(
        &self,
        acting_user: &str,
        offer: NewContract,
    ) -> Result<(Contract, bool), SettlementError> {
        if acting_user != offer.tasker_id {
            return Err(SettlementError::Forbidden(format!(
                "Only the tasker may accept an offer on gig {}",
                offer.gig_id
            )));
        }
        let ledger = self.fee_schedule.compute(offer.service_amount())?;
        let (contract, created) = self.db.create_accepted_contract(offer, ledger).await?;
        if created {
            debug!(
                "🔄️📋️ Contract #{} accepted for gig {}. Payer owes {}",
                contract.id, contract.gig_id, contract.service_amount + contract.fee_amount + contract.tax_amount
            );
            self.call_contract_hook(ContractStatus::PendingAcceptance, &contract).await;
        }
        Ok((contract, created))
    }

    /// The provider funds the contract: creates the payment record, asks the gateway for a payment intent and
    /// attaches the intent id. The payment sits in `Processing` until the provider's webhook settles it.
    pub async fn create_payment_intent<G: GatewayAdapter>(
        &self,
        acting_user: &str,
        contract_id: i64,
        gateway: &G,
    ) -> Result<(Contract, Payment), SettlementError> {
        let contract = self.fetch_contract(contract_id).await?;
        if acting_user != contract.provider_id {
            return Err(SettlementError::Forbidden(format!(
                "Only the provider may fund contract {contract_id}"
            )));
        }
        if contract.status != ContractStatus::PendingPayment {
            return Err(SettlementError::Conflict(format!(
                "Contract {contract_id} is '{}', not awaiting payment",
                contract.status
            )));
        }
        // Re-use an in-flight charge instead of creating a second intent for the same contract.
        if let Some(existing) = self
            .db
            .fetch_payments_for_contract(contract_id)
            .await?
            .into_iter()
            .find(|p| p.payment_type == PaymentType::Payment && p.intent_id.is_some() && !p.status.is_terminal())
        {
            debug!("🔄️💳️ Contract #{contract_id} already has intent {:?} in flight", existing.intent_id);
            return Ok((contract, existing));
        }
        let ledger = contract_ledger(&contract);
        let payment = self.db.insert_payment(NewPayment::for_contract(&contract, ledger, gateway.name())).await?;
        let request = PaymentIntentRequest {
            amount: payment.total_provider_payment,
            currency: payment.currency.clone(),
            application_fee: payment.application_fee_amount,
            reference: payment.id.to_string(),
            payer_id: payment.payer_id.clone(),
        };
        let response = match gateway.create_payment_intent(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!("🔄️💳️ Gateway rejected intent for payment #{}: {e}", payment.id);
                if let Err(db_err) = self.db.mark_payment_failed(payment.id).await {
                    error!("🔄️💳️ Could not mark payment #{} as failed: {db_err}", payment.id);
                }
                return Err(e.into());
            },
        };
        let payment = self.db.attach_payment_intent(payment.id, &response.id).await?;
        debug!("🔄️💳️ Payment #{} for contract #{contract_id} has intent {}", payment.id, response.id);
        Ok((contract, payment))
    }

    /// The tasker submits completed work: `Active -> Submitted`. Hours worked are recorded on hourly contracts
    /// before the transition.
    pub async fn submit_work(
        &self,
        acting_user: &str,
        contract_id: i64,
        actual_hours: Option<i64>,
    ) -> Result<Contract, SettlementError> {
        let contract = self.fetch_contract(contract_id).await?;
        if acting_user != contract.tasker_id {
            return Err(SettlementError::Forbidden(format!(
                "Only the tasker may submit work on contract {contract_id}"
            )));
        }
        if let Some(hours) = actual_hours {
            if hours < 0 {
                return Err(SettlementError::Validation(format!("Hours worked cannot be negative, got {hours}")));
            }
            self.db.record_actual_hours(contract_id, hours).await?;
        }
        let updated = self
            .db
            .transition_contract(contract_id, &[ContractStatus::Active], ContractStatus::Submitted, None)
            .await?;
        self.call_contract_hook(contract.status, &updated).await;
        Ok(updated)
    }

    /// The provider sends the work back for changes: `Submitted -> Active`. `work_submitted_at` keeps its original
    /// value for the next submission.
    pub async fn request_revision(&self, acting_user: &str, contract_id: i64) -> Result<Contract, SettlementError> {
        let contract = self.fetch_contract(contract_id).await?;
        if acting_user != contract.provider_id {
            return Err(SettlementError::Forbidden(format!(
                "Only the provider may request a revision on contract {contract_id}"
            )));
        }
        let updated = self
            .db
            .transition_contract(contract_id, &[ContractStatus::Submitted], ContractStatus::Active, None)
            .await?;
        self.call_contract_hook(contract.status, &updated).await;
        Ok(updated)
    }

    /// The provider approves the work. `Submitted -> Approved` is the exactly-once gate: the compare-and-set winner
    /// creates the payout, claims the payout slot on the payment record and completes the contract. A second,
    /// concurrent approval loses the CAS and gets a conflict; calling again once the contract is `Completed` is an
    /// idempotent success.
    ///
    /// A gateway failure leaves the contract in `Approved` with the payout slot unclaimed, so the call can be
    /// retried without risking a double payout.
    pub async fn approve_completion<G: GatewayAdapter>(
        &self,
        acting_user: &str,
        contract_id: i64,
        gateway: &G,
        destination_account: &str,
    ) -> Result<(Contract, Payment), SettlementError> {
        let contract = self.fetch_contract(contract_id).await?;
        if acting_user != contract.provider_id {
            return Err(SettlementError::Forbidden(format!(
                "Only the provider may approve completion of contract {contract_id}"
            )));
        }
        let funding = self.funded_payment(contract_id).await?;
        if contract.status == ContractStatus::Completed {
            debug!("🔄️🏦️ Contract #{contract_id} is already completed. Nothing to do.");
            return Ok((contract, funding));
        }
        let contract = match contract.status {
            // Retry path: a previous approval moved the contract but failed before the payout was claimed.
            ContractStatus::Approved => contract,
            _ => {
                let updated = self
                    .db
                    .transition_contract(contract_id, &[ContractStatus::Submitted], ContractStatus::Approved, None)
                    .await?;
                self.call_contract_hook(contract.status, &updated).await;
                updated
            },
        };
        let request = PayoutRequest {
            amount: funding.amount_received_by_payee,
            currency: funding.currency.clone(),
            destination_account: destination_account.to_string(),
            reference: funding.id.to_string(),
        };
        let response = gateway.create_payout(&request).await?;
        let payment = match self.db.claim_payout(funding.id, &response.id).await {
            Ok(p) => {
                self.call_payout_created_hook(&p).await;
                p
            },
            // The slot was claimed by an earlier attempt whose completion step did not land. Finish that one.
            Err(SettlementDatabaseError::PayoutAlreadyClaimed(_, existing)) => *existing,
            Err(e) => return Err(e.into()),
        };
        let completed = self
            .db
            .transition_contract(contract_id, &[ContractStatus::Approved], ContractStatus::Completed, None)
            .await?;
        self.call_contract_hook(contract.status, &completed).await;
        info!(
            "🔄️🏦️ Contract #{contract_id} completed. {} paid out to {}",
            payment.amount_received_by_payee, payment.payee_id
        );
        Ok((completed, payment))
    }

    /// Cancels a contract. The target variant must match the caller's role: the provider cancels as provider, the
    /// tasker as tasker, and either party may record a mutual cancellation. Re-cancelling with the same variant is
    /// an idempotent success.
    pub async fn cancel_contract(
        &self,
        acting_user: &str,
        contract_id: i64,
        new_status: ContractStatus,
        reason: Option<String>,
    ) -> Result<Contract, SettlementError> {
        if !new_status.is_cancelled() {
            return Err(SettlementError::Validation(format!("'{new_status}' is not a cancellation state")));
        }
        let contract = self.fetch_contract(contract_id).await?;
        let permitted = match new_status {
            ContractStatus::CancelledByProvider => acting_user == contract.provider_id,
            ContractStatus::CancelledByTasker => acting_user == contract.tasker_id,
            ContractStatus::CancelledMutual => {
                acting_user == contract.provider_id || acting_user == contract.tasker_id
            },
            _ => false,
        };
        if !permitted {
            return Err(SettlementError::Forbidden(format!(
                "User {acting_user} may not cancel contract {contract_id} as '{new_status}'"
            )));
        }
        if contract.status == new_status {
            return Ok(contract);
        }
        let updated = self
            .db
            .transition_contract(
                contract_id,
                &[ContractStatus::PendingPayment, ContractStatus::Active, ContractStatus::Submitted],
                new_status,
                reason,
            )
            .await?;
        self.call_contract_hook(contract.status, &updated).await;
        Ok(updated)
    }

    /// The provider asks for their money back on a funded contract. The refund is *initiated* here; the payment only
    /// becomes `Refunded` when the provider's webhook confirms it.
    pub async fn refund_contract<G: GatewayAdapter>(
        &self,
        acting_user: &str,
        contract_id: i64,
        gateway: &G,
    ) -> Result<(Contract, Payment), SettlementError> {
        let contract = self.fetch_contract(contract_id).await?;
        if acting_user != contract.provider_id {
            return Err(SettlementError::Forbidden(format!(
                "Only the provider may refund contract {contract_id}"
            )));
        }
        let funding = self.funded_payment(contract_id).await?;
        let intent_id = funding
            .intent_id
            .clone()
            .ok_or_else(|| SettlementError::Conflict(format!("Payment #{} has no charge to refund", funding.id)))?;
        let response = gateway.refund_payment(&intent_id, None).await?;
        let payment = self.db.attach_refund(funding.id, &response.id).await?;
        debug!("🔄️↩️ Refund {} initiated for contract #{contract_id}", response.id);
        Ok((contract, payment))
    }

    /// A tasker withdraws their balance to their provider account. No fee, no tax; the record settles when the
    /// payout webhook arrives.
    pub async fn withdraw<G: GatewayAdapter>(
        &self,
        acting_user: &str,
        amount: MoneyCents,
        gateway: &G,
        provider_account_id: &str,
    ) -> Result<Payment, SettlementError> {
        if !amount.is_positive() {
            return Err(SettlementError::Validation(format!("Withdrawal amount must be positive, got {amount}")));
        }
        let payment = self
            .db
            .insert_payment(NewPayment::withdrawal(acting_user, amount, gateway.name(), provider_account_id))
            .await?;
        let request = PayoutRequest {
            amount,
            currency: payment.currency.clone(),
            destination_account: provider_account_id.to_string(),
            reference: payment.id.to_string(),
        };
        let response = match gateway.create_payout(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!("🔄️🏦️ Gateway rejected withdrawal payout for payment #{}: {e}", payment.id);
                if let Err(db_err) = self.db.mark_payment_failed(payment.id).await {
                    error!("🔄️🏦️ Could not mark payment #{} as failed: {db_err}", payment.id);
                }
                return Err(e.into());
            },
        };
        let payment = self.db.claim_payout(payment.id, &response.id).await?;
        self.call_payout_created_hook(&payment).await;
        info!("🔄️🏦️ Withdrawal #{} of {amount} initiated for {acting_user}", payment.id);
        Ok(payment)
    }

    /// Applies a signature-verified, normalized webhook event to the ledger.
    ///
    /// Returns `Ok(None)` when the event was acknowledged without being applied (unknown external id, amount
    /// mismatch, or a status regression); each of those is recorded as an anomaly. Duplicates come back as
    /// `Some(settled)` with `applied == false`. The caller acknowledges in every `Ok` case so the provider stops
    /// retrying.
    pub async fn reconcile_webhook_event(
        &self,
        event: WebhookEvent,
    ) -> Result<Option<SettledPayment>, SettlementError> {
        let Some(payment) = self.db.fetch_payment_by_external_id(&event.external_id).await? else {
            let detail = format!("No payment record matches {} event '{}'", event.kind, event.external_id);
            self.flag_anomaly(&event, &detail).await?;
            return Ok(None);
        };
        if let Some(reported) = event.amount {
            let expected = match payment.payment_type {
                PaymentType::Payment => payment.total_provider_payment,
                PaymentType::Withdrawal => payment.amount_received_by_payee,
            };
            if reported != expected {
                let detail = format!(
                    "Amount mismatch on payment #{}: gateway reported {reported}, ledger says {expected}",
                    payment.id
                );
                self.flag_anomaly(&event, &detail).await?;
                return Ok(None);
            }
        }
        let new_status = PaymentStatus::from(event.kind.implied_status());
        match self.db.settle_payment(payment.id, new_status).await {
            Ok(settled) => {
                if settled.applied {
                    info!(
                        "🔄️📨️ {} event settled payment #{} as '{}'",
                        event.gateway, settled.payment.id, settled.payment.status
                    );
                    self.call_payment_settled_hook(&settled).await;
                } else {
                    debug!("🔄️📨️ Duplicate {} event for payment #{}. Acknowledged.", event.kind, payment.id);
                }
                Ok(Some(settled))
            },
            Err(SettlementDatabaseError::PaymentStatusConflict { id, current, requested, .. }) => {
                let detail =
                    format!("Out-of-order event: payment #{id} is '{current}', refusing to move to '{requested}'");
                self.flag_anomaly(&event, &detail).await?;
                Ok(None)
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Money summary for the user's dashboard.
    pub async fn dashboard(&self, user_id: &str) -> Result<DashboardSummary, SettlementError> {
        let summary = self.db.dashboard_summary(user_id).await?;
        Ok(summary)
    }

    pub async fn contract(&self, contract_id: i64) -> Result<Contract, SettlementError> {
        self.fetch_contract(contract_id).await
    }

    pub async fn contracts_for_user(&self, user_id: &str) -> Result<Vec<Contract>, SettlementError> {
        let contracts = self.db.fetch_contracts_for_user(user_id).await?;
        Ok(contracts)
    }

    pub async fn payments_for_contract(&self, contract_id: i64) -> Result<Vec<Payment>, SettlementError> {
        let payments = self.db.fetch_payments_for_contract(contract_id).await?;
        Ok(payments)
    }

    //------------------------------------------ helpers -------------------------------------------------------------

    async fn fetch_contract(&self, contract_id: i64) -> Result<Contract, SettlementError> {
        self.db
            .fetch_contract(contract_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("Contract {contract_id}")))
    }

    /// The settled charge that funds the contract.
    async fn funded_payment(&self, contract_id: i64) -> Result<Payment, SettlementError> {
        self.db
            .fetch_payments_for_contract(contract_id)
            .await?
            .into_iter()
            .find(|p| p.payment_type == PaymentType::Payment && p.status == PaymentStatus::Succeeded)
            .ok_or_else(|| SettlementError::Conflict(format!("Contract {contract_id} has no settled payment")))
    }

    async fn flag_anomaly(&self, event: &WebhookEvent, detail: &str) -> Result<(), SettlementError> {
        self.db.record_anomaly(&event.external_id, &event.gateway, detail).await?;
        for emitter in &self.producers.webhook_anomaly_producer {
            emitter.publish_event(WebhookAnomalyEvent::new(&event.gateway, &event.external_id, detail)).await;
        }
        Ok(())
    }

    async fn call_contract_hook(&self, old_status: ContractStatus, contract: &Contract) {
        for emitter in &self.producers.contract_transitioned_producer {
            let event = ContractTransitionedEvent::new(old_status, contract.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_payment_settled_hook(&self, settled: &SettledPayment) {
        for emitter in &self.producers.payment_settled_producer {
            let event = PaymentSettledEvent::new(settled.payment.clone(), settled.contract.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_payout_created_hook(&self, payment: &Payment) {
        for emitter in &self.producers.payout_created_producer {
            let event = PayoutCreatedEvent::new(payment.clone());
            emitter.publish_event(event).await;
        }
    }
}

/// Reconstructs the ledger snapshot stored on the contract at acceptance time. The charge is always built from this
/// snapshot rather than the current fee schedule, so a schedule change never reprices an accepted contract.
fn contract_ledger(contract: &Contract) -> FeeBreakdown {
    FeeBreakdown {
        application_fee_amount: contract.fee_amount,
        provider_tax_amount: contract.tax_amount,
        tasker_tax_amount: MoneyCents::default(),
        total_provider_payment: contract.service_amount + contract.fee_amount + contract.tax_amount,
        amount_received_by_payee: contract.payout_amount,
    }
}
