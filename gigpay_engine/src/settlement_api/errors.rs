use gateway_tools::GatewayError;
use gigpay_common::fees::FeeCalculationError;
use thiserror::Error;

use crate::traits::{SettlementDatabaseError, SettlementQueryError};

/// The error taxonomy of the settlement API. The server crate maps each variant onto an HTTP status; nothing in this
/// crate knows about HTTP.
#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Not permitted: {0}")]
    Forbidden(String),
    #[error("Conflicting state: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Fee calculation error: {0}")]
    Fee(#[from] FeeCalculationError),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<SettlementDatabaseError> for SettlementError {
    fn from(e: SettlementDatabaseError) -> Self {
        use SettlementDatabaseError::*;
        match e {
            DatabaseError(msg) => SettlementError::Database(msg),
            ContractNotFound(id) => SettlementError::NotFound(format!("Contract {id}")),
            PaymentNotFound(id) => SettlementError::NotFound(format!("Payment {id}")),
            e @ (ContractConflict { .. }
            | PaymentStatusConflict { .. }
            | PayoutAlreadyClaimed(..)
            | ExternalIdAlreadyAttached { .. }
            | ContractPaymentStatusConflict { .. }) => SettlementError::Conflict(e.to_string()),
        }
    }
}

impl From<SettlementQueryError> for SettlementError {
    fn from(e: SettlementQueryError) -> Self {
        match e {
            SettlementQueryError::DatabaseError(msg) => SettlementError::Database(msg),
        }
    }
}
