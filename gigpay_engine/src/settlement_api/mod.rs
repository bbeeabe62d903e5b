//! # Settlement engine public API
//!
//! [`SettlementApi`] is the façade the server's request handlers drive. An instance is created by supplying a
//! database backend that implements [`crate::traits::SettlementDatabase`], plus the event producers the caller wants
//! notified:
//!
//! ```rust,ignore
//! use gigpay_common::{FeeSchedule, MoneyCents};
//! use gigpay_engine::{SettlementApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/gigpay.db", 25).await?;
//! let schedule = FeeSchedule::new(MoneyCents::from(500), 1000, 1300);
//! let api = SettlementApi::new(db, producers, schedule);
//! let (contract, _) = api.accept_offer("tasker-1", offer).await?;
//! ```
//!
//! Every operation performs its own acting-user authorization check, so the server layer only has to establish *who*
//! is calling, never *whether* they may.

mod errors;
mod settlement_flow_api;

pub use errors::SettlementError;
pub use settlement_flow_api::SettlementApi;
