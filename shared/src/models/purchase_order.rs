//! Purchase-order draft models and the order quantity policy

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DomainError;

/// A purchase-order draft owned by the replenishment planner.
///
/// The draft is a forward-looking intent record: creating one never changes
/// the status of the alert it was drafted from. The external Purchasing
/// system assigns the authoritative order number and drives the status
/// lifecycle, which is only consumed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderDraft {
    pub id: Uuid,
    /// Source alert; `None` for manual drafts
    pub alert_id: Option<Uuid>,
    pub supplier_id: Uuid,
    pub status: OrderStatus,
    /// Assigned by the Purchasing system once submitted
    pub external_order_number: Option<String>,
    pub notes: Option<String>,
    pub expected_delivery: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<DraftLine>,
}

impl PurchaseOrderDraft {
    /// Advisory cost preview; recomputed authoritatively by the Purchasing
    /// system at confirmation time.
    pub fn cost_preview(&self) -> Decimal {
        self.lines.iter().map(DraftLine::line_total).sum()
    }
}

/// One ordered product on a draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl DraftLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order status lifecycle owned by the external Purchasing system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Draft,
        OrderStatus::Pending,
        OrderStatus::Approved,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "draft" => Ok(OrderStatus::Draft),
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::UnknownValue {
                field: "order status",
                value: other.to_string(),
            }),
        }
    }

    /// An open draft blocks further drafts for the same alert. Completed
    /// orders delivered their stock and cancelled ones were rejected; both
    /// free the alert for a new intent.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            OrderStatus::Draft | OrderStatus::Pending | OrderStatus::Approved
        )
    }

    /// Storage forms of the statuses that count as an open draft, for use in
    /// queries that scan for blocking drafts
    pub fn open_statuses() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|status| status.is_open())
            .map(OrderStatus::as_str)
            .collect()
    }
}

/// Default order quantity: `max(minimum_order_size, 2 * threshold - stock)`,
/// rounded up to the supplier's packaging multiple if one is configured.
///
/// An explicit operator override bypasses this policy entirely (it is taken
/// as-is after the positivity check), so overrides are not rounded.
pub fn default_order_quantity(
    current_stock: i32,
    low_stock_threshold: i32,
    minimum_order_size: i32,
    packaging_multiple: Option<i32>,
) -> Result<i32, DomainError> {
    if low_stock_threshold <= 0 {
        return Err(DomainError::InvalidThreshold(low_stock_threshold));
    }
    if current_stock < 0 {
        return Err(DomainError::NegativeStock(current_stock as i64));
    }

    let shortfall = (2 * low_stock_threshold as i64 - current_stock as i64).max(0);
    let mut quantity = shortfall.max(minimum_order_size as i64);

    if let Some(pack) = packaging_multiple.filter(|p| *p > 1) {
        let pack = pack as i64;
        quantity = (quantity + pack - 1) / pack * pack;
    }

    if quantity < 1 || quantity > i32::MAX as i64 {
        return Err(DomainError::InvalidQuantity(quantity));
    }
    Ok(quantity as i32)
}

/// Validate an operator-supplied quantity override
pub fn validate_quantity_override(quantity: i32) -> Result<i32, DomainError> {
    if quantity < 1 {
        return Err(DomainError::InvalidQuantity(quantity as i64));
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quantity_covers_shortfall() {
        // threshold 50, stock 10, minimum 50: max(50, 100 - 10) = 90
        assert_eq!(default_order_quantity(10, 50, 50, None).unwrap(), 90);
    }

    #[test]
    fn minimum_order_size_wins_small_shortfalls() {
        // threshold 20, stock 35: shortfall 5, minimum 50
        assert_eq!(default_order_quantity(35, 20, 50, None).unwrap(), 50);
    }

    #[test]
    fn quantity_rounds_up_to_packaging_multiple() {
        // shortfall 90, pack of 24 -> 96
        assert_eq!(default_order_quantity(10, 50, 50, Some(24)).unwrap(), 96);
        // already a multiple stays put
        assert_eq!(default_order_quantity(10, 50, 50, Some(30)).unwrap(), 90);
    }

    #[test]
    fn zero_threshold_rejected() {
        assert!(default_order_quantity(10, 0, 50, None).is_err());
    }

    #[test]
    fn override_must_be_positive() {
        assert!(validate_quantity_override(0).is_err());
        assert!(validate_quantity_override(-3).is_err());
        assert_eq!(validate_quantity_override(7).unwrap(), 7);
    }

    #[test]
    fn open_statuses_block_new_drafts() {
        assert!(OrderStatus::Draft.is_open());
        assert!(OrderStatus::Pending.is_open());
        assert!(OrderStatus::Approved.is_open());
        assert!(!OrderStatus::Completed.is_open());
        assert!(!OrderStatus::Cancelled.is_open());
    }

    #[test]
    fn open_status_storage_set_matches_lifecycle() {
        assert_eq!(
            OrderStatus::open_statuses(),
            vec!["draft", "pending", "approved"]
        );
    }
}
