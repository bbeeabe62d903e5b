//! An in-memory gateway adapter for exercising settlement flows without a network.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use gateway_tools::{
    types::{
        GatewayAccount,
        GatewayAccountStatus,
        GatewayBalance,
        GatewayPaymentStatus,
        GatewayResponse,
        NewAccountRequest,
        PaymentIntentRequest,
        PayoutRequest,
        WebhookEvent,
    },
    GatewayAdapter,
    GatewayError,
};
use gigpay_common::MoneyCents;

#[derive(Default, Clone)]
pub struct TestGateway {
    pub fail_intents: bool,
    pub fail_payouts: bool,
    pub intents_created: Arc<AtomicUsize>,
    pub payouts_created: Arc<AtomicUsize>,
}

impl TestGateway {
    pub fn intent_count(&self) -> usize {
        self.intents_created.load(Ordering::SeqCst)
    }

    pub fn payout_count(&self) -> usize {
        self.payouts_created.load(Ordering::SeqCst)
    }

    fn response(&self, id: String, status: GatewayPaymentStatus, amount: MoneyCents, currency: &str) -> GatewayResponse {
        GatewayResponse {
            id,
            status,
            amount: Some(amount),
            currency: Some(currency.to_string()),
            gateway: self.name().to_string(),
        }
    }
}

impl GatewayAdapter for TestGateway {
    fn name(&self) -> &'static str {
        "testgate"
    }

    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<GatewayResponse, GatewayError> {
        if self.fail_intents {
            return Err(GatewayError::new(self.name(), "intent creation declined"));
        }
        self.intents_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.response(
            format!("pi_{}", request.reference),
            GatewayPaymentStatus::Processing,
            request.amount,
            &request.currency,
        ))
    }

    async fn capture_payment(&self, intent_id: &str) -> Result<GatewayResponse, GatewayError> {
        Ok(self.response(intent_id.to_string(), GatewayPaymentStatus::Succeeded, MoneyCents::default(), "usd"))
    }

    async fn refund_payment(
        &self,
        intent_id: &str,
        amount: Option<MoneyCents>,
    ) -> Result<GatewayResponse, GatewayError> {
        Ok(self.response(
            format!("re_{intent_id}"),
            GatewayPaymentStatus::Processing,
            amount.unwrap_or_default(),
            "usd",
        ))
    }

    async fn get_status(&self, external_id: &str) -> Result<GatewayResponse, GatewayError> {
        Ok(self.response(external_id.to_string(), GatewayPaymentStatus::Processing, MoneyCents::default(), "usd"))
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<GatewayResponse, GatewayError> {
        if self.fail_payouts {
            return Err(GatewayError::new(self.name(), "payout declined"));
        }
        self.payouts_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.response(
            format!("po_{}", request.reference),
            GatewayPaymentStatus::Pending,
            request.amount,
            &request.currency,
        ))
    }

    async fn get_balance(&self, account_id: &str) -> Result<GatewayBalance, GatewayError> {
        let _ = account_id;
        Ok(GatewayBalance {
            gateway: self.name().to_string(),
            currency: "usd".to_string(),
            available: MoneyCents::from(1_000_000),
            pending: MoneyCents::default(),
        })
    }

    async fn create_account(&self, request: &NewAccountRequest) -> Result<GatewayAccount, GatewayError> {
        Ok(GatewayAccount {
            id: format!("acct_{}", request.user_id),
            gateway: self.name().to_string(),
            status: GatewayAccountStatus::Active,
        })
    }

    async fn get_account_status(&self, account_id: &str) -> Result<GatewayAccount, GatewayError> {
        Ok(GatewayAccount {
            id: account_id.to_string(),
            gateway: self.name().to_string(),
            status: GatewayAccountStatus::Active,
        })
    }

    fn parse_webhook(&self, _body: &[u8]) -> Result<WebhookEvent, GatewayError> {
        Err(GatewayError::new(self.name(), "the test gateway does not deliver webhooks"))
    }
}
