//! Domain models for the Warehouse Management Platform

pub mod alert;
pub mod bill;
pub mod product;
pub mod purchase_order;

pub use alert::*;
pub use bill::*;
pub use product::*;
pub use purchase_order::*;

use thiserror::Error;

/// Errors raised by pure domain derivations.
///
/// These are recovered at the service boundary and mapped onto the API error
/// taxonomy; they never carry storage or transport concerns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("low stock threshold must be positive, got {0}")]
    InvalidThreshold(i32),

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("stock level cannot be negative, got {0}")]
    NegativeStock(i64),

    #[error("invalid alert transition: {from} -> {to}")]
    InvalidTransition { from: AlertStatus, to: AlertStatus },

    #[error("unknown {field} value: {value}")]
    UnknownValue { field: &'static str, value: String },
}
