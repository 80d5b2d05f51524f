//! Alert ledger models and lifecycle rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DomainError;

/// An alert tracked by the ledger.
///
/// At most one active low-stock alert exists per product at any time. Alerts
/// are retained for audit once resolved; `status` is the lifecycle marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub product_id: Uuid,
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub status: AlertStatus,
    pub message: String,
    /// Stock level when the alert was raised or last refreshed
    pub stock_snapshot: i32,
    /// Threshold when the alert was raised or last refreshed
    pub threshold_snapshot: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Alert kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    System,
    Manual,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::LowStock => "low_stock",
            AlertKind::System => "system",
            AlertKind::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "low_stock" => Ok(AlertKind::LowStock),
            "system" => Ok(AlertKind::System),
            "manual" => Ok(AlertKind::Manual),
            other => Err(DomainError::UnknownValue {
                field: "alert kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Alert lifecycle states.
///
/// `active --acknowledge--> acknowledged --resolve--> resolved`, with the
/// direct `active --resolve--> resolved` path allowed. `resolved` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "active" => Ok(AlertStatus::Active),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(DomainError::UnknownValue {
                field: "alert status",
                value: other.to_string(),
            }),
        }
    }

    /// Whether this status allows a transition to `next`
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::Acknowledged)
                | (AlertStatus::Active, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }

    /// Apply a lifecycle transition, rejecting anything the state machine
    /// does not allow
    pub fn transition_to(self, next: AlertStatus) -> Result<AlertStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// An alert is open until it reaches `resolved`
    pub fn is_open(self) -> bool {
        !matches!(self, AlertStatus::Resolved)
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert priorities, derived from the stock/threshold ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    High,
    Medium,
    Low,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::High => "high",
            AlertPriority::Medium => "medium",
            AlertPriority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "high" => Ok(AlertPriority::High),
            "medium" => Ok(AlertPriority::Medium),
            "low" => Ok(AlertPriority::Low),
            other => Err(DomainError::UnknownValue {
                field: "alert priority",
                value: other.to_string(),
            }),
        }
    }

    /// Derive the priority for a stock level, if the product is in alerting
    /// range at all.
    ///
    /// With r = current_stock / low_stock_threshold: r <= 0.5 is high,
    /// 0.5 < r <= 1.0 is medium, and anything up to the watch band is low.
    /// `watch_band_percent` is the upper bound of the alerting range as a
    /// percentage of the threshold (120 means alerts are kept up to 1.2x).
    /// Returns `Ok(None)` above the watch band. A non-positive threshold is a
    /// configuration error surfaced to the caller, not silently defaulted.
    ///
    /// Integer arithmetic throughout; the ratio is never materialised as a
    /// float.
    pub fn for_stock_level(
        current_stock: i32,
        low_stock_threshold: i32,
        watch_band_percent: u32,
    ) -> Result<Option<AlertPriority>, DomainError> {
        if low_stock_threshold <= 0 {
            return Err(DomainError::InvalidThreshold(low_stock_threshold));
        }
        if current_stock < 0 {
            return Err(DomainError::NegativeStock(current_stock as i64));
        }

        let stock = current_stock as i64;
        let threshold = low_stock_threshold as i64;

        if stock * 2 <= threshold {
            Ok(Some(AlertPriority::High))
        } else if stock <= threshold {
            Ok(Some(AlertPriority::Medium))
        } else if stock * 100 <= threshold * watch_band_percent as i64 {
            Ok(Some(AlertPriority::Low))
        } else {
            Ok(None)
        }
    }
}

/// Standard message for a low-stock alert, carrying the stock snapshot
pub fn low_stock_message(current_stock: i32, low_stock_threshold: i32) -> String {
    format!(
        "Stock at {}/{} units",
        current_stock, low_stock_threshold
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_bands() {
        // threshold 100: stock 40 -> high, 80 -> medium, 110 -> low (within
        // the 1.2x watch band), 130 -> none
        assert_eq!(
            AlertPriority::for_stock_level(40, 100, 120).unwrap(),
            Some(AlertPriority::High)
        );
        assert_eq!(
            AlertPriority::for_stock_level(80, 100, 120).unwrap(),
            Some(AlertPriority::Medium)
        );
        assert_eq!(
            AlertPriority::for_stock_level(110, 100, 120).unwrap(),
            Some(AlertPriority::Low)
        );
        assert_eq!(AlertPriority::for_stock_level(130, 100, 120).unwrap(), None);
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert_eq!(
            AlertPriority::for_stock_level(50, 100, 120).unwrap(),
            Some(AlertPriority::High)
        );
        assert_eq!(
            AlertPriority::for_stock_level(100, 100, 120).unwrap(),
            Some(AlertPriority::Medium)
        );
        assert_eq!(
            AlertPriority::for_stock_level(120, 100, 120).unwrap(),
            Some(AlertPriority::Low)
        );
        assert_eq!(AlertPriority::for_stock_level(121, 100, 120).unwrap(), None);
    }

    #[test]
    fn zero_threshold_is_a_configuration_error() {
        assert!(AlertPriority::for_stock_level(10, 0, 120).is_err());
        assert!(AlertPriority::for_stock_level(10, -5, 120).is_err());
    }

    #[test]
    fn status_transitions() {
        use AlertStatus::*;
        assert!(Active.can_transition_to(Acknowledged));
        assert!(Active.can_transition_to(Resolved));
        assert!(Acknowledged.can_transition_to(Resolved));
        // resolved is terminal
        assert!(!Resolved.can_transition_to(Active));
        assert!(!Resolved.can_transition_to(Acknowledged));
        assert!(!Acknowledged.can_transition_to(Active));
    }

    #[test]
    fn rejected_transitions_surface_both_states() {
        let err = AlertStatus::Resolved
            .transition_to(AlertStatus::Acknowledged)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: AlertStatus::Resolved,
                to: AlertStatus::Acknowledged,
            }
        );

        assert_eq!(
            AlertStatus::Active.transition_to(AlertStatus::Resolved),
            Ok(AlertStatus::Resolved)
        );
    }

    #[test]
    fn message_carries_stock_snapshot() {
        assert_eq!(low_stock_message(0, 20), "Stock at 0/20 units");
    }
}
