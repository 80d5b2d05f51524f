//! Catalog store tests
//!
//! Tests for stock accounting rules:
//! - Adjustments never drive stock negative
//! - Severity ordering of low-stock listings
//! - Concurrent deltas compose under serialization

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::Product;
use std::str::FromStr;
use uuid::Uuid;

fn product(stock: i32, threshold: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "Packing Tape 48mm".to_string(),
        category: "consumables".to_string(),
        current_stock: stock,
        low_stock_threshold: threshold,
        unit_price: Decimal::from_str("2.40").unwrap(),
        supplier_id: Uuid::new_v4(),
        active: true,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

/// Pure form of the adjustment rule the catalog enforces under its row lock
fn apply_delta(stock: i32, delta: i32) -> Result<i32, &'static str> {
    let next = stock as i64 + delta as i64;
    if next < 0 {
        return Err("would drive stock below zero");
    }
    if next > i32::MAX as i64 {
        return Err("overflows the stock counter");
    }
    Ok(next as i32)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Negative results are rejected, exact zero is fine
    #[test]
    fn test_stock_floor() {
        assert_eq!(apply_delta(10, -10).unwrap(), 0);
        assert!(apply_delta(10, -11).is_err());
        assert_eq!(apply_delta(0, 5).unwrap(), 5);
    }

    /// Overflow is rejected before it wraps
    #[test]
    fn test_stock_overflow() {
        assert!(apply_delta(i32::MAX, 1).is_err());
        assert_eq!(apply_delta(i32::MAX - 1, 1).unwrap(), i32::MAX);
    }

    /// Below-threshold is inclusive of the threshold itself
    #[test]
    fn test_below_threshold_inclusive() {
        assert!(product(100, 100).is_below_threshold());
        assert!(product(0, 100).is_below_threshold());
        assert!(!product(101, 100).is_below_threshold());
    }

    /// Severity ratio orders the most critical products first
    #[test]
    fn test_severity_ordering() {
        let mut products = vec![product(80, 100), product(10, 100), product(30, 60)];
        products.sort_by(|a, b| {
            a.severity_ratio()
                .cmp(&b.severity_ratio())
                .then_with(|| a.name.cmp(&b.name))
        });

        assert_eq!(products[0].current_stock, 10); // ratio 0.10
        assert_eq!(products[1].current_stock, 30); // ratio 0.50
        assert_eq!(products[2].current_stock, 80); // ratio 0.80
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// An accepted adjustment always leaves stock in range
        #[test]
        fn prop_accepted_adjustments_stay_in_range(
            stock in 0i32..1_000_000,
            delta in -1_000_000i32..1_000_000,
        ) {
            if let Ok(next) = apply_delta(stock, delta) {
                prop_assert!(next >= 0);
                prop_assert_eq!(next as i64, stock as i64 + delta as i64);
            } else {
                prop_assert!((stock as i64 + delta as i64) < 0);
            }
        }

        /// Serialized deltas compose: applying a sequence one at a time ends
        /// at the sum whenever every intermediate step is accepted
        #[test]
        fn prop_serialized_deltas_compose(
            start in 0i32..100_000,
            deltas in prop::collection::vec(-500i32..500, 1..20),
        ) {
            let mut stock = start;
            let mut all_accepted = true;

            for delta in &deltas {
                match apply_delta(stock, *delta) {
                    Ok(next) => stock = next,
                    Err(_) => {
                        all_accepted = false;
                        break;
                    }
                }
            }

            if all_accepted {
                let sum: i64 = deltas.iter().map(|d| *d as i64).sum();
                prop_assert_eq!(stock as i64, start as i64 + sum);
            }
            prop_assert!(stock >= 0);
        }

        /// The severity ratio is strictly monotone in stock for a fixed
        /// threshold, so the listing order is stable
        #[test]
        fn prop_severity_monotone(
            stock in 1i32..10_000,
            threshold in 1i32..1_000,
        ) {
            let lower = product(stock - 1, threshold);
            let higher = product(stock, threshold);
            prop_assert!(lower.severity_ratio() < higher.severity_ratio());
        }
    }
}
