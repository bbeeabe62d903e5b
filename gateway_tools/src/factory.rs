//! The gateway factory.
//!
//! Centralizes the "supported providers" policy: which keys are valid, how each adapter is constructed, and the
//! human-readable metadata clients see when choosing a payment method. The metadata is purely descriptive; nothing in
//! it may be used to authorize an operation.

use gigpay_common::MoneyCents;
use serde::Serialize;

use crate::{
    adapter::GatewayAdapter,
    bankwire::BankWireApi,
    cardgate::CardGateApi,
    config::GatewayConfig,
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

pub const CARDGATE: &str = "cardgate";
pub const BANKWIRE: &str = "bankwire";

/// Display metadata for one supported provider.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayInfo {
    pub key: &'static str,
    pub display_name: &'static str,
    pub currencies: &'static [&'static str],
    pub countries: &'static [&'static str],
    pub processing_time: &'static str,
}

pub const SUPPORTED_GATEWAYS: &[GatewayInfo] = &[
    GatewayInfo {
        key: CARDGATE,
        display_name: "CardGate (credit & debit cards)",
        currencies: &["usd", "cad", "eur"],
        countries: &["US", "CA", "DE", "FR", "NL"],
        processing_time: "Instant to 1 business day",
    },
    GatewayInfo {
        key: BANKWIRE,
        display_name: "BankWire (bank transfer)",
        currencies: &["usd", "cad"],
        countries: &["US", "CA"],
        processing_time: "1 to 3 business days",
    },
];

/// A constructed adapter for one of the supported providers.
///
/// The enum lets the engine hold a single concrete type while still dispatching through the [`GatewayAdapter`]
/// contract; no code outside this crate ever matches on the variants.
#[derive(Clone, Debug)]
pub enum Gateway {
    CardGate(CardGateApi),
    BankWire(BankWireApi),
}

impl GatewayAdapter for Gateway {
    fn name(&self) -> &'static str {
        match self {
            Gateway::CardGate(api) => api.name(),
            Gateway::BankWire(api) => api.name(),
        }
    }

    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<GatewayResponse, GatewayError> {
        match self {
            Gateway::CardGate(api) => api.create_payment_intent(request).await,
            Gateway::BankWire(api) => api.create_payment_intent(request).await,
        }
    }

    async fn capture_payment(&self, intent_id: &str) -> Result<GatewayResponse, GatewayError> {
        match self {
            Gateway::CardGate(api) => api.capture_payment(intent_id).await,
            Gateway::BankWire(api) => api.capture_payment(intent_id).await,
        }
    }

    async fn refund_payment(
        &self,
        intent_id: &str,
        amount: Option<MoneyCents>,
    ) -> Result<GatewayResponse, GatewayError> {
        match self {
            Gateway::CardGate(api) => api.refund_payment(intent_id, amount).await,
            Gateway::BankWire(api) => api.refund_payment(intent_id, amount).await,
        }
    }

    async fn get_status(&self, external_id: &str) -> Result<GatewayResponse, GatewayError> {
        match self {
            Gateway::CardGate(api) => api.get_status(external_id).await,
            Gateway::BankWire(api) => api.get_status(external_id).await,
        }
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<GatewayResponse, GatewayError> {
        match self {
            Gateway::CardGate(api) => api.create_payout(request).await,
            Gateway::BankWire(api) => api.create_payout(request).await,
        }
    }

    async fn get_balance(&self, account_id: &str) -> Result<GatewayBalance, GatewayError> {
        match self {
            Gateway::CardGate(api) => api.get_balance(account_id).await,
            Gateway::BankWire(api) => api.get_balance(account_id).await,
        }
    }

    async fn create_account(&self, request: &NewAccountRequest) -> Result<GatewayAccount, GatewayError> {
        match self {
            Gateway::CardGate(api) => api.create_account(request).await,
            Gateway::BankWire(api) => api.create_account(request).await,
        }
    }

    async fn get_account_status(&self, account_id: &str) -> Result<GatewayAccount, GatewayError> {
        match self {
            Gateway::CardGate(api) => api.get_account_status(account_id).await,
            Gateway::BankWire(api) => api.get_account_status(account_id).await,
        }
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent, GatewayError> {
        match self {
            Gateway::CardGate(api) => api.parse_webhook(body),
            Gateway::BankWire(api) => api.parse_webhook(body),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GatewayFactory {
    cardgate: GatewayConfig,
    bankwire: GatewayConfig,
}

impl GatewayFactory {
    pub fn new(cardgate: GatewayConfig, bankwire: GatewayConfig) -> Self {
        Self { cardgate, bankwire }
    }

    pub fn from_env_or_default() -> Self {
        Self {
            cardgate: GatewayConfig::from_env_or_default("GIGPAY_CARDGATE", "https://api.cardgate.test"),
            bankwire: GatewayConfig::from_env_or_default("GIGPAY_BANKWIRE", "https://api.bankwire.test"),
        }
    }

    /// Builds the adapter for the given provider key. Unsupported keys are a configuration error, reported with the
    /// offending key so the caller can see exactly what was asked for.
    pub fn for_provider(&self, key: &str) -> Result<Gateway, GatewayError> {
        match key {
            CARDGATE => CardGateApi::new(self.cardgate.clone()).map(Gateway::CardGate),
            BANKWIRE => BankWireApi::new(self.bankwire.clone()).map(Gateway::BankWire),
            other => Err(GatewayError::unsupported(other)),
        }
    }

    /// The webhook shared secret for the given provider, used by the inbound signature check.
    pub fn webhook_secret(&self, key: &str) -> Result<gigpay_common::Secret<String>, GatewayError> {
        match key {
            CARDGATE => Ok(self.cardgate.webhook_secret.clone()),
            BANKWIRE => Ok(self.bankwire.webhook_secret.clone()),
            other => Err(GatewayError::unsupported(other)),
        }
    }

    pub fn is_supported(key: &str) -> bool {
        SUPPORTED_GATEWAYS.iter().any(|info| info.key == key)
    }

    pub fn supported_gateways() -> &'static [GatewayInfo] {
        SUPPORTED_GATEWAYS
    }

    pub fn gateway_info(key: &str) -> Option<&'static GatewayInfo> {
        SUPPORTED_GATEWAYS.iter().find(|info| info.key == key)
    }
}
