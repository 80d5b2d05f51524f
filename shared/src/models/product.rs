//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product in the warehouse catalog.
///
/// Products referenced by an open alert or draft order are never deleted;
/// they are soft-deactivated via `active` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub current_stock: i32,
    pub low_stock_threshold: i32,
    pub unit_price: Decimal,
    pub supplier_id: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Severity ratio `current_stock / low_stock_threshold`.
    ///
    /// This is the tie-break used everywhere severity is displayed: low-stock
    /// listings are ordered by it ascending, most critical first. The
    /// threshold is guaranteed positive by the catalog.
    pub fn severity_ratio(&self) -> Decimal {
        Decimal::from(self.current_stock) / Decimal::from(self.low_stock_threshold)
    }

    /// Whether the product is at or below its low-stock threshold
    pub fn is_below_threshold(&self) -> bool {
        self.current_stock <= self.low_stock_threshold
    }
}

/// A supplier of catalog products
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    /// Orders to this supplier are rounded up to this pack size, if set
    pub packaging_multiple: Option<i32>,
    /// Delivery lead time; falls back to the configured default when unset
    pub lead_time_days: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// A single stock mutation recorded for audit.
///
/// Every stock change (dispatch, receiving, reconciliation, manual
/// adjustment) flows through the catalog's adjust-stock primitive and leaves
/// one of these behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub delta: i32,
    pub reason: String,
    pub stock_after: i32,
    pub created_at: DateTime<Utc>,
}
