//! Normalized gateway shapes.
//!
//! The rest of the system never branches on provider identity; it works exclusively with these types. Each adapter is
//! responsible for mapping its provider's payloads into them.

use std::fmt::Display;
use std::str::FromStr;

use gigpay_common::MoneyCents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid gateway value: {0}")]
pub struct GatewayTypeConversionError(pub String);

//-------------------------------------- GatewayPaymentStatus --------------------------------------------------------
/// Provider-agnostic payment status. Adapters map each provider's status vocabulary onto this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Refunded,
}

impl Display for GatewayPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayPaymentStatus::Pending => write!(f, "pending"),
            GatewayPaymentStatus::Processing => write!(f, "processing"),
            GatewayPaymentStatus::Succeeded => write!(f, "succeeded"),
            GatewayPaymentStatus::Failed => write!(f, "failed"),
            GatewayPaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for GatewayPaymentStatus {
    type Err = GatewayTypeConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            s => Err(GatewayTypeConversionError(format!("Invalid gateway payment status: {s}"))),
        }
    }
}

//--------------------------------------   GatewayResponse    --------------------------------------------------------
/// The common shape every money-movement call returns: `{id, status, amount?, currency?, gateway}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// The provider's external identifier for the object (intent id, transfer id, payout id or refund id).
    pub id: String,
    pub status: GatewayPaymentStatus,
    pub amount: Option<MoneyCents>,
    pub currency: Option<String>,
    /// The key of the gateway that produced this response.
    pub gateway: String,
}

//--------------------------------------    GatewayBalance    --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayBalance {
    pub gateway: String,
    pub currency: String,
    pub available: MoneyCents,
    pub pending: MoneyCents,
}

//--------------------------------------    GatewayAccount    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayAccountStatus {
    Onboarding,
    Active,
    Disabled,
}

impl Display for GatewayAccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayAccountStatus::Onboarding => write!(f, "onboarding"),
            GatewayAccountStatus::Active => write!(f, "active"),
            GatewayAccountStatus::Disabled => write!(f, "disabled"),
        }
    }
}

/// A payee's account at the provider, used as the destination for payouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAccount {
    pub id: String,
    pub gateway: String,
    pub status: GatewayAccountStatus,
}

//--------------------------------------      Requests        --------------------------------------------------------
/// A request to charge the paying party. `amount` is the total charge (service + fee + tax); the platform fee share
/// is carried separately so providers that support destination charges can split at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    pub amount: MoneyCents,
    pub currency: String,
    pub application_fee: MoneyCents,
    /// Our own payment record reference, echoed back by the provider in webhooks.
    pub reference: String,
    pub payer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub amount: MoneyCents,
    pub currency: String,
    /// The payee's provider account id.
    pub destination_account: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccountRequest {
    pub user_id: String,
    pub country: String,
    pub currency: String,
}

//--------------------------------------    WebhookEvent      --------------------------------------------------------
/// The normalized form of an inbound provider webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventKind {
    PaymentSucceeded,
    PaymentFailed,
    PaymentRefunded,
    PayoutPaid,
    PayoutFailed,
}

impl Display for WebhookEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookEventKind::PaymentSucceeded => write!(f, "payment_succeeded"),
            WebhookEventKind::PaymentFailed => write!(f, "payment_failed"),
            WebhookEventKind::PaymentRefunded => write!(f, "payment_refunded"),
            WebhookEventKind::PayoutPaid => write!(f, "payout_paid"),
            WebhookEventKind::PayoutFailed => write!(f, "payout_failed"),
        }
    }
}

impl WebhookEventKind {
    /// The payment status this event implies once applied.
    pub fn implied_status(&self) -> GatewayPaymentStatus {
        match self {
            WebhookEventKind::PaymentSucceeded | WebhookEventKind::PayoutPaid => GatewayPaymentStatus::Succeeded,
            WebhookEventKind::PaymentFailed | WebhookEventKind::PayoutFailed => GatewayPaymentStatus::Failed,
            WebhookEventKind::PaymentRefunded => GatewayPaymentStatus::Refunded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub gateway: String,
    /// The provider's identifier for the affected object. Matched against the external ids stored on our payment
    /// records; this is the idempotency key for reconciliation.
    pub external_id: String,
    pub kind: WebhookEventKind,
    pub amount: Option<MoneyCents>,
    pub currency: Option<String>,
}
