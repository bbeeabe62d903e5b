use gigpay_common::MoneyCents;

use crate::{
    types::{
        GatewayAccount,
        GatewayBalance,
        GatewayResponse,
        NewAccountRequest,
        PaymentIntentRequest,
        PayoutRequest,
        WebhookEvent,
    },
    GatewayError,
};

/// The uniform capability contract every payment provider adapter implements.
///
/// All eight operations return normalized types; callers never see provider payloads. Network failures and provider
/// rejections both surface as [`GatewayError`]. A call that times out gives no verdict about the provider-side
/// outcome, so callers must leave the corresponding payment record in `Pending`/`Processing` and wait for the
/// webhook rather than assume success.
#[allow(async_fn_in_trait)]
pub trait GatewayAdapter {
    /// The provider key, as used by the factory and stored on payment records.
    fn name(&self) -> &'static str;

    /// Creates a payment intent for the given charge and returns its external id and initial status.
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<GatewayResponse, GatewayError>;

    /// Captures a previously created payment intent.
    async fn capture_payment(&self, intent_id: &str) -> Result<GatewayResponse, GatewayError>;

    /// Refunds a captured payment, in full when `amount` is `None`.
    async fn refund_payment(
        &self,
        intent_id: &str,
        amount: Option<MoneyCents>,
    ) -> Result<GatewayResponse, GatewayError>;

    /// Fetches the provider's current view of a payment or payout.
    async fn get_status(&self, external_id: &str) -> Result<GatewayResponse, GatewayError>;

    /// Sends funds to a payee's provider account.
    async fn create_payout(&self, request: &PayoutRequest) -> Result<GatewayResponse, GatewayError>;

    /// Returns the available/pending balance of a provider account.
    async fn get_balance(&self, account_id: &str) -> Result<GatewayBalance, GatewayError>;

    /// Creates a payee account at the provider (onboarding target for payouts).
    async fn create_account(&self, request: &NewAccountRequest) -> Result<GatewayAccount, GatewayError>;

    /// Fetches the onboarding/verification status of a payee account.
    async fn get_account_status(&self, account_id: &str) -> Result<GatewayAccount, GatewayError>;

    /// Normalizes a raw (already signature-verified) webhook body into a [`WebhookEvent`].
    ///
    /// Event types the reconciler does not care about are rejected with an error naming the type, so the caller can
    /// acknowledge and drop them.
    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent, GatewayError>;
}
