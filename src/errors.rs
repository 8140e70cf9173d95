use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::transfer::TransferStatus;

/// Crate-wide service error type.
///
/// Validation-style errors (duplicate codes, unknown ids, insufficient
/// stock, illegal state-machine moves) abort the operation with no partial
/// mutation; callers can rely on the ledger being untouched when one of
/// these is returned.
#[derive(Error, Debug, Serialize)]
pub enum ServiceError {
    #[error("Warehouse code already in use: {0}")]
    DuplicateCode(String),

    #[error("Location {0} already exists in warehouse")]
    DuplicateLocation(String),

    #[error("Warehouse not found: {0}")]
    WarehouseNotFound(Uuid),

    #[error("Warehouse location not found: {0}")]
    LocationNotFound(Uuid),

    #[error("Order has no customer location; required by the {algorithm} allocation algorithm")]
    MissingCustomerLocation { algorithm: String },

    #[error(
        "Insufficient inventory for product {product_id} at warehouse {warehouse_id}: \
         requested {requested}, available {available}"
    )]
    InsufficientInventory {
        product_id: Uuid,
        warehouse_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Insufficient history for forecast: need {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Cannot forecast from an empty demand history")]
    EmptyHistory,

    #[error("Transfer not found: {0}")]
    TransferNotFound(Uuid),

    #[error("Invalid transfer transition: {from} -> {to}")]
    InvalidTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Event error: {0}")]
    Event(String),
}

impl ServiceError {
    /// Maps validator output onto the crate error type.
    pub fn validation(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}
