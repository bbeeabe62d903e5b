//! GigPay Settlement Engine
//!
//! The settlement engine owns everything that moves a gig contract from acceptance to paid completion: the contract
//! state machine, the ledger records for every money movement, and the reconciliation of asynchronous payment
//! provider webhooks. It is HTTP-agnostic; the server crate wires it to the web layer.
//!
//! The library is divided into three main sections:
//! 1. Database management ([`mod@sqlite`]). SQLite is the supported backend. You should never need to touch the
//!    database directly; every mutation goes through the guarded transition functions exposed by the backend traits,
//!    so contract and payment records can only move along legal state-machine edges.
//! 2. The settlement API ([`mod@settlement_api`]). [`SettlementApi`] is the façade request handlers use: accept an
//!    offer, create a payment intent, submit/approve work, withdraw, reconcile a webhook. Each operation performs a
//!    single acting-user authorization check and returns the updated contract and payment together.
//! 3. Events ([`mod@events`]). An actor-style hook system; the notification and operator-alert collaborators are
//!    injected as hooks at startup rather than registered through any process-wide state.

pub mod db_types;
pub mod events;
mod settlement_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use settlement_api::{SettlementApi, SettlementError};
pub use traits::{SettlementDatabase, SettlementDatabaseError, SettlementQuery};
