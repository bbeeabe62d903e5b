//! Adapter for BankWire, the bank-transfer processor.
//!
//! BankWire settles over the interbank network, so nearly every transfer spends time `in_transit` before the
//! settlement webhook arrives. There is no client-side confirmation step; `capture_payment` maps to the transfer
//! confirmation call that releases it into the network.

use std::sync::Arc;

use gigpay_common::MoneyCents;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    adapter::GatewayAdapter,
    config::GatewayConfig,
    factory::BANKWIRE,
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
        WebhookEventKind,
    },
    GatewayError,
};

#[derive(Clone, Debug)]
pub struct BankWireApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl BankWireApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal())
            .map_err(|e| GatewayError::new(BANKWIRE, e.to_string()))?;
        headers.insert("X-Api-Key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::new(BANKWIRE, format!("Could not initialize client: {e}")))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.config.api_url);
        trace!("🏦️ BankWire request: {} {url}", method.as_str());
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayError::new(BANKWIRE, e.to_string()))?;
        if response.status().is_success() {
            trace!("🏦️ BankWire response ok: {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayError::new(BANKWIRE, format!("Invalid response: {e}")))
        } else {
            let status = response.status().as_u16();
            let message = response
                .json::<BankWireErrorBody>()
                .await
                .map(|e| e.message)
                .unwrap_or_else(|e| format!("Unparseable error body: {e}"));
            Err(GatewayError::new(BANKWIRE, format!("Request failed with status {status}: {message}")))
        }
    }

    fn normalize(&self, transfer: BankWireTransfer) -> GatewayResponse {
        GatewayResponse {
            id: transfer.transfer_id,
            status: map_state(&transfer.state),
            amount: transfer.amount_cents.map(MoneyCents::from),
            currency: transfer.currency,
            gateway: BANKWIRE.to_string(),
        }
    }
}

fn map_state(state: &str) -> GatewayPaymentStatus {
    match state {
        "created" | "awaiting_funds" => GatewayPaymentStatus::Pending,
        "in_transit" => GatewayPaymentStatus::Processing,
        "settled" => GatewayPaymentStatus::Succeeded,
        "returned" => GatewayPaymentStatus::Refunded,
        "bounced" | "cancelled" => GatewayPaymentStatus::Failed,
        other => {
            warn!("🏦️ Unrecognised BankWire state '{other}', treating as processing");
            GatewayPaymentStatus::Processing
        },
    }
}

//--------------------------------------  BankWire payloads   --------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BankWireTransfer {
    transfer_id: String,
    state: String,
    amount_cents: Option<i64>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BankWireAccount {
    account_id: String,
    verification: String,
}

#[derive(Debug, Deserialize)]
struct BankWireBalance {
    available_cents: i64,
    incoming_cents: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct BankWireErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BankWireEvent {
    event: String,
    transfer_id: String,
    amount_cents: Option<i64>,
    currency: Option<String>,
}

impl GatewayAdapter for BankWireApi {
    fn name(&self) -> &'static str {
        BANKWIRE
    }

    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<GatewayResponse, GatewayError> {
        let body = json!({
            "amount_cents": request.amount.value(),
            "currency": request.currency,
            "fee_cents": request.application_fee.value(),
            "reference": request.reference,
            "originator": request.payer_id,
        });
        let transfer: BankWireTransfer = self.rest_query(Method::POST, "/api/transfers", Some(body)).await?;
        debug!("🏦️ Created transfer {} for {}", transfer.transfer_id, request.amount);
        Ok(self.normalize(transfer))
    }

    async fn capture_payment(&self, intent_id: &str) -> Result<GatewayResponse, GatewayError> {
        let path = format!("/api/transfers/{intent_id}/confirm");
        let transfer: BankWireTransfer = self.rest_query(Method::POST, &path, None::<Value>).await?;
        Ok(self.normalize(transfer))
    }

    async fn refund_payment(
        &self,
        intent_id: &str,
        amount: Option<MoneyCents>,
    ) -> Result<GatewayResponse, GatewayError> {
        let path = format!("/api/transfers/{intent_id}/return");
        let body = amount.map(|a| json!({ "amount_cents": a.value() }));
        let transfer: BankWireTransfer = self.rest_query(Method::POST, &path, body).await?;
        debug!("🏦️ Return initiated for transfer {intent_id}");
        Ok(self.normalize(transfer))
    }

    async fn get_status(&self, external_id: &str) -> Result<GatewayResponse, GatewayError> {
        let path = format!("/api/transfers/{external_id}");
        let transfer: BankWireTransfer = self.rest_query(Method::GET, &path, None::<Value>).await?;
        Ok(self.normalize(transfer))
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<GatewayResponse, GatewayError> {
        let body = json!({
            "amount_cents": request.amount.value(),
            "currency": request.currency,
            "beneficiary_account": request.destination_account,
            "reference": request.reference,
        });
        let transfer: BankWireTransfer = self.rest_query(Method::POST, "/api/payouts", Some(body)).await?;
        debug!("🏦️ Payout {} created for {}", transfer.transfer_id, request.amount);
        Ok(self.normalize(transfer))
    }

    async fn get_balance(&self, account_id: &str) -> Result<GatewayBalance, GatewayError> {
        let path = format!("/api/accounts/{account_id}/balance");
        let bal: BankWireBalance = self.rest_query(Method::GET, &path, None::<Value>).await?;
        Ok(GatewayBalance {
            gateway: BANKWIRE.to_string(),
            currency: bal.currency,
            available: MoneyCents::from(bal.available_cents),
            pending: MoneyCents::from(bal.incoming_cents),
        })
    }

    async fn create_account(&self, request: &NewAccountRequest) -> Result<GatewayAccount, GatewayError> {
        let body = json!({
            "country": request.country,
            "currency": request.currency,
            "external_reference": request.user_id,
        });
        let acc: BankWireAccount = self.rest_query(Method::POST, "/api/accounts", Some(body)).await?;
        Ok(normalize_account(acc))
    }

    async fn get_account_status(&self, account_id: &str) -> Result<GatewayAccount, GatewayError> {
        let path = format!("/api/accounts/{account_id}");
        let acc: BankWireAccount = self.rest_query(Method::GET, &path, None::<Value>).await?;
        Ok(normalize_account(acc))
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent, GatewayError> {
        let event: BankWireEvent = serde_json::from_slice(body)
            .map_err(|e| GatewayError::new(BANKWIRE, format!("Unparseable webhook body: {e}")))?;
        let kind = match event.event.as_str() {
            "transfer.settled" => WebhookEventKind::PaymentSucceeded,
            "transfer.bounced" => WebhookEventKind::PaymentFailed,
            "transfer.returned" => WebhookEventKind::PaymentRefunded,
            "payout.settled" => WebhookEventKind::PayoutPaid,
            "payout.bounced" => WebhookEventKind::PayoutFailed,
            other => return Err(GatewayError::new(BANKWIRE, format!("Ignoring webhook event type '{other}'"))),
        };
        Ok(WebhookEvent {
            gateway: BANKWIRE.to_string(),
            external_id: event.transfer_id,
            kind,
            amount: event.amount_cents.map(MoneyCents::from),
            currency: event.currency,
        })
    }
}

fn normalize_account(acc: BankWireAccount) -> GatewayAccount {
    let status = match acc.verification.as_str() {
        "verified" => GatewayAccountStatus::Active,
        "rejected" | "suspended" => GatewayAccountStatus::Disabled,
        _ => GatewayAccountStatus::Onboarding,
    };
    GatewayAccount { id: acc.account_id, gateway: BANKWIRE.to_string(), status }
}

#[cfg(test)]
mod test {
    use super::*;

    fn api() -> BankWireApi {
        BankWireApi::new(GatewayConfig::default()).unwrap()
    }

    #[test]
    fn parses_settled_webhook() {
        let body = r#"{ "event": "transfer.settled", "transfer_id": "tr_77", "amount_cents": 5000, "currency": "usd" }"#;
        let event = api().parse_webhook(body.as_bytes()).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentSucceeded);
        assert_eq!(event.external_id, "tr_77");
        assert_eq!(event.gateway, BANKWIRE);
    }

    #[test]
    fn parses_payout_bounce() {
        let body = r#"{ "event": "payout.bounced", "transfer_id": "po_12" }"#;
        let event = api().parse_webhook(body.as_bytes()).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PayoutFailed);
        assert_eq!(event.amount, None);
    }

    #[test]
    fn state_mapping_covers_lifecycle() {
        assert_eq!(map_state("created"), GatewayPaymentStatus::Pending);
        assert_eq!(map_state("in_transit"), GatewayPaymentStatus::Processing);
        assert_eq!(map_state("settled"), GatewayPaymentStatus::Succeeded);
        assert_eq!(map_state("bounced"), GatewayPaymentStatus::Failed);
        assert_eq!(map_state("returned"), GatewayPaymentStatus::Refunded);
    }
}
