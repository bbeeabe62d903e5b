//! Adapter for CardGate, the card processor.
//!
//! CardGate's API is intent-based: a payment intent is created for the total charge, confirmed client-side, captured
//! by us, and settled asynchronously via webhook. All CardGate payload shapes stay inside this module.

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
    factory::CARDGATE,
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
pub struct CardGateApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl CardGateApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.api_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| GatewayError::new(CARDGATE, e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::new(CARDGATE, format!("Could not initialize client: {e}")))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.config.api_url);
        trace!("💳️ CardGate request: {} {url}", method.as_str());
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayError::new(CARDGATE, e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ CardGate response ok: {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayError::new(CARDGATE, format!("Invalid response: {e}")))
        } else {
            let status = response.status().as_u16();
            let message = response
                .json::<CardGateErrorBody>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|e| format!("Unparseable error body: {e}"));
            Err(GatewayError::new(CARDGATE, format!("Request failed with status {status}: {message}")))
        }
    }

    fn normalize(&self, obj: CardGateObject) -> GatewayResponse {
        GatewayResponse {
            id: obj.id,
            status: map_status(&obj.status),
            amount: obj.amount.map(MoneyCents::from),
            currency: obj.currency,
            gateway: CARDGATE.to_string(),
        }
    }
}

fn map_status(status: &str) -> GatewayPaymentStatus {
    match status {
        "requires_confirmation" | "requires_payment_method" | "requires_capture" => GatewayPaymentStatus::Pending,
        "processing" | "in_transit" => GatewayPaymentStatus::Processing,
        "succeeded" | "paid" => GatewayPaymentStatus::Succeeded,
        "refunded" => GatewayPaymentStatus::Refunded,
        "canceled" | "failed" => GatewayPaymentStatus::Failed,
        other => {
            warn!("💳️ Unrecognised CardGate status '{other}', treating as processing");
            GatewayPaymentStatus::Processing
        },
    }
}

//--------------------------------------  CardGate payloads   --------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CardGateObject {
    id: String,
    status: String,
    amount: Option<i64>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardGateAccount {
    id: String,
    payouts_enabled: bool,
    disabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CardGateBalance {
    available: i64,
    pending: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct CardGateErrorBody {
    error: CardGateErrorDetail,
}

#[derive(Debug, Deserialize)]
struct CardGateErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CardGateEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: CardGateEventData,
}

#[derive(Debug, Deserialize)]
struct CardGateEventData {
    object: CardGateEventObject,
}

#[derive(Debug, Deserialize)]
struct CardGateEventObject {
    id: String,
    /// Refund events carry the original intent id alongside the refund's own id.
    payment_intent: Option<String>,
    amount: Option<i64>,
    currency: Option<String>,
}

impl GatewayAdapter for CardGateApi {
    fn name(&self) -> &'static str {
        CARDGATE
    }

    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<GatewayResponse, GatewayError> {
        let body = json!({
            "amount": request.amount.value(),
            "currency": request.currency,
            "application_fee_amount": request.application_fee.value(),
            "metadata": { "reference": request.reference, "payer": request.payer_id },
        });
        let obj: CardGateObject = self.rest_query(Method::POST, "/v1/payment_intents", Some(body)).await?;
        debug!("💳️ Created payment intent {} for {}", obj.id, request.amount);
        Ok(self.normalize(obj))
    }

    async fn capture_payment(&self, intent_id: &str) -> Result<GatewayResponse, GatewayError> {
        let path = format!("/v1/payment_intents/{intent_id}/capture");
        let obj: CardGateObject = self.rest_query(Method::POST, &path, None::<Value>).await?;
        Ok(self.normalize(obj))
    }

    async fn refund_payment(
        &self,
        intent_id: &str,
        amount: Option<MoneyCents>,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut body = json!({ "payment_intent": intent_id });
        if let Some(amount) = amount {
            body["amount"] = json!(amount.value());
        }
        let obj: CardGateObject = self.rest_query(Method::POST, "/v1/refunds", Some(body)).await?;
        debug!("💳️ Refund {} created for intent {intent_id}", obj.id);
        Ok(self.normalize(obj))
    }

    async fn get_status(&self, external_id: &str) -> Result<GatewayResponse, GatewayError> {
        let path = format!("/v1/payment_intents/{external_id}");
        let obj: CardGateObject = self.rest_query(Method::GET, &path, None::<Value>).await?;
        Ok(self.normalize(obj))
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<GatewayResponse, GatewayError> {
        let body = json!({
            "amount": request.amount.value(),
            "currency": request.currency,
            "destination": request.destination_account,
            "metadata": { "reference": request.reference },
        });
        let obj: CardGateObject = self.rest_query(Method::POST, "/v1/payouts", Some(body)).await?;
        debug!("💳️ Payout {} created for {}", obj.id, request.amount);
        Ok(self.normalize(obj))
    }

    async fn get_balance(&self, account_id: &str) -> Result<GatewayBalance, GatewayError> {
        let path = format!("/v1/accounts/{account_id}/balance");
        let bal: CardGateBalance = self.rest_query(Method::GET, &path, None::<Value>).await?;
        Ok(GatewayBalance {
            gateway: CARDGATE.to_string(),
            currency: bal.currency,
            available: MoneyCents::from(bal.available),
            pending: MoneyCents::from(bal.pending),
        })
    }

    async fn create_account(&self, request: &NewAccountRequest) -> Result<GatewayAccount, GatewayError> {
        let body = json!({
            "country": request.country,
            "default_currency": request.currency,
            "metadata": { "user_id": request.user_id },
        });
        let acc: CardGateAccount = self.rest_query(Method::POST, "/v1/accounts", Some(body)).await?;
        Ok(normalize_account(acc))
    }

    async fn get_account_status(&self, account_id: &str) -> Result<GatewayAccount, GatewayError> {
        let path = format!("/v1/accounts/{account_id}");
        let acc: CardGateAccount = self.rest_query(Method::GET, &path, None::<Value>).await?;
        Ok(normalize_account(acc))
    }

    fn parse_webhook(&self, body: &[u8]) -> Result<WebhookEvent, GatewayError> {
        let event: CardGateEvent = serde_json::from_slice(body)
            .map_err(|e| GatewayError::new(CARDGATE, format!("Unparseable webhook body: {e}")))?;
        let kind = match event.event_type.as_str() {
            "payment_intent.succeeded" => WebhookEventKind::PaymentSucceeded,
            "payment_intent.payment_failed" => WebhookEventKind::PaymentFailed,
            "charge.refunded" => WebhookEventKind::PaymentRefunded,
            "payout.paid" => WebhookEventKind::PayoutPaid,
            "payout.failed" => WebhookEventKind::PayoutFailed,
            other => return Err(GatewayError::new(CARDGATE, format!("Ignoring webhook event type '{other}'"))),
        };
        let object = event.data.object;
        // Refund events are keyed by the refunded intent so reconciliation matches our stored id.
        let external_id = match kind {
            WebhookEventKind::PaymentRefunded => object.payment_intent.unwrap_or(object.id),
            _ => object.id,
        };
        Ok(WebhookEvent {
            gateway: CARDGATE.to_string(),
            external_id,
            kind,
            amount: object.amount.map(MoneyCents::from),
            currency: object.currency,
        })
    }
}

fn normalize_account(acc: CardGateAccount) -> GatewayAccount {
    let status = if acc.disabled.unwrap_or(false) {
        GatewayAccountStatus::Disabled
    } else if acc.payouts_enabled {
        GatewayAccountStatus::Active
    } else {
        GatewayAccountStatus::Onboarding
    };
    GatewayAccount { id: acc.id, gateway: CARDGATE.to_string(), status }
}

#[cfg(test)]
mod test {
    use super::*;

    fn api() -> CardGateApi {
        CardGateApi::new(GatewayConfig::default()).unwrap()
    }

    #[test]
    fn parses_succeeded_webhook() {
        let body = r#"{
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_123", "amount": 12995, "currency": "usd" } }
        }"#;
        let event = api().parse_webhook(body.as_bytes()).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentSucceeded);
        assert_eq!(event.external_id, "pi_123");
        assert_eq!(event.amount, Some(MoneyCents::from(12995)));
        assert_eq!(event.gateway, CARDGATE);
    }

    #[test]
    fn refund_webhook_is_keyed_by_intent() {
        let body = r#"{
            "id": "evt_2",
            "type": "charge.refunded",
            "data": { "object": { "id": "re_9", "payment_intent": "pi_123", "amount": 12995, "currency": "usd" } }
        }"#;
        let event = api().parse_webhook(body.as_bytes()).unwrap();
        assert_eq!(event.kind, WebhookEventKind::PaymentRefunded);
        assert_eq!(event.external_id, "pi_123");
    }

    #[test]
    fn unknown_event_types_are_rejected() {
        let body = r#"{ "id": "evt_3", "type": "customer.created", "data": { "object": { "id": "cus_1" } } }"#;
        let err = api().parse_webhook(body.as_bytes()).unwrap_err();
        assert!(err.message.contains("customer.created"));
    }

    #[test]
    fn status_mapping_covers_lifecycle() {
        assert_eq!(map_status("requires_confirmation"), GatewayPaymentStatus::Pending);
        assert_eq!(map_status("processing"), GatewayPaymentStatus::Processing);
        assert_eq!(map_status("succeeded"), GatewayPaymentStatus::Succeeded);
        assert_eq!(map_status("failed"), GatewayPaymentStatus::Failed);
        assert_eq!(map_status("refunded"), GatewayPaymentStatus::Refunded);
    }
}
