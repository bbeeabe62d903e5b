//! Payment provider adapters for the GigPay settlement engine.
//!
//! Every supported payment provider (the `cardgate` card processor and the `bankwire` bank-transfer processor) is
//! wrapped behind the [`GatewayAdapter`] trait. The adapters normalize each provider's REST responses into the
//! common shapes in [`types`], and translate every provider failure into a single [`GatewayError`]. Provider-specific
//! payloads, status strings and HTTP types never leave this crate; the engine only ever sees the normalized forms.
//!
//! [`GatewayFactory`] maps a provider key to a constructed adapter and owns the "supported providers" policy,
//! including the human-readable metadata served to clients. The metadata is descriptive only and must never feed an
//! authorization decision.
//!
//! [`webhook`] implements the shared webhook authentication scheme: HMAC-SHA256 over `"{timestamp}.{raw_body}"`,
//! hex-encoded, with a bounded timestamp window for replay protection.

mod adapter;
mod bankwire;
mod cardgate;
mod config;
mod error;
mod factory;

pub mod types;
pub mod webhook;

pub use adapter::GatewayAdapter;
pub use bankwire::BankWireApi;
pub use cardgate::CardGateApi;
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use factory::{Gateway, GatewayFactory, GatewayInfo, BANKWIRE, CARDGATE, SUPPORTED_GATEWAYS};
