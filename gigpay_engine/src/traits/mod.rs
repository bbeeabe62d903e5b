//! Interface contracts for settlement database backends.
//!
//! * [`SettlementDatabase`] defines the guarded, transactional mutations: contract creation, compare-and-set state
//!   transitions, payment insertion and settlement. Every write that must be atomic lives behind one of its methods.
//! * [`SettlementQuery`] provides read-only access to contracts, payments and the dashboard aggregation.
//!
//! Backends (currently SQLite) implement both; everything above this layer is backend-agnostic.

mod data_objects;
mod settlement_database;
mod settlement_query;

pub use data_objects::{DashboardSummary, SettledPayment};
pub use settlement_database::{SettlementDatabase, SettlementDatabaseError};
pub use settlement_query::{SettlementQuery, SettlementQueryError};
