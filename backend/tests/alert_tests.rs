//! Alert ledger and threshold monitor tests
//!
//! Tests for alert derivation and lifecycle including:
//! - Priority band derivation from stock/threshold ratio
//! - Alert status state machine
//! - Single-open-alert-per-product invariant under re-evaluation

use proptest::prelude::*;
use shared::models::{low_stock_message, AlertPriority, AlertStatus};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test the three priority bands at a threshold of 100
    #[test]
    fn test_priority_bands() {
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

    /// Test band edges are inclusive
    #[test]
    fn test_band_edges() {
        // exactly half the threshold is still high
        assert_eq!(
            AlertPriority::for_stock_level(50, 100, 120).unwrap(),
            Some(AlertPriority::High)
        );
        // exactly at the threshold is still medium
        assert_eq!(
            AlertPriority::for_stock_level(100, 100, 120).unwrap(),
            Some(AlertPriority::Medium)
        );
        // exactly at the watch band edge is still low
        assert_eq!(
            AlertPriority::for_stock_level(120, 100, 120).unwrap(),
            Some(AlertPriority::Low)
        );
        assert_eq!(AlertPriority::for_stock_level(121, 100, 120).unwrap(), None);
    }

    /// Zero stock is high priority, not an error
    #[test]
    fn test_zero_stock_is_high() {
        assert_eq!(
            AlertPriority::for_stock_level(0, 20, 120).unwrap(),
            Some(AlertPriority::High)
        );
    }

    /// Misconfigured thresholds are an error, not a silent default
    #[test]
    fn test_bad_threshold_is_error() {
        assert!(AlertPriority::for_stock_level(10, 0, 120).is_err());
        assert!(AlertPriority::for_stock_level(10, -1, 120).is_err());
        assert!(AlertPriority::for_stock_level(-1, 20, 120).is_err());
    }

    /// A watch band of exactly 100 disables the low band entirely
    #[test]
    fn test_minimal_watch_band() {
        assert_eq!(AlertPriority::for_stock_level(101, 100, 100).unwrap(), None);
        assert_eq!(
            AlertPriority::for_stock_level(100, 100, 100).unwrap(),
            Some(AlertPriority::Medium)
        );
    }

    /// Test the alert status state machine
    #[test]
    fn test_status_transitions() {
        use AlertStatus::*;
        assert!(Active.can_transition_to(Acknowledged));
        assert!(Active.can_transition_to(Resolved));
        assert!(Acknowledged.can_transition_to(Resolved));

        // resolved is terminal
        assert!(!Resolved.can_transition_to(Active));
        assert!(!Resolved.can_transition_to(Acknowledged));
        assert!(!Resolved.can_transition_to(Resolved));

        // no backward transitions
        assert!(!Acknowledged.can_transition_to(Active));
    }

    /// Open means not resolved
    #[test]
    fn test_open_statuses() {
        assert!(AlertStatus::Active.is_open());
        assert!(AlertStatus::Acknowledged.is_open());
        assert!(!AlertStatus::Resolved.is_open());
    }

    /// Test enum round-trips through their storage form
    #[test]
    fn test_status_storage_round_trip() {
        for status in [
            AlertStatus::Active,
            AlertStatus::Acknowledged,
            AlertStatus::Resolved,
        ] {
            assert_eq!(AlertStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(AlertStatus::parse("closed").is_err());
    }

    /// Out-of-stock product alerts at high priority; receiving enough stock
    /// to clear the watch band leaves it out of alerting range entirely
    #[test]
    fn test_recovery_scenario() {
        // 0 of 20 on hand
        assert_eq!(
            AlertPriority::for_stock_level(0, 20, 120).unwrap(),
            Some(AlertPriority::High)
        );
        assert_eq!(low_stock_message(0, 20), "Stock at 0/20 units");

        // receiving +25 puts it at 25, above the 1.2x watch band of 24
        assert_eq!(AlertPriority::for_stock_level(25, 20, 120).unwrap(), None);
    }

    /// Test the low-stock message format
    #[test]
    fn test_low_stock_message() {
        assert_eq!(low_stock_message(0, 20), "Stock at 0/20 units");
        assert_eq!(low_stock_message(45, 100), "Stock at 45/100 units");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// The open low-stock alert for one product, as the ledger tracks it
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct OpenAlert {
        priority: AlertPriority,
        acknowledged: bool,
    }

    /// Pure simulation of one monitor evaluation against the ledger state
    fn simulate_evaluation(
        open: Option<OpenAlert>,
        stock: i32,
        threshold: i32,
        watch_band: u32,
    ) -> Option<OpenAlert> {
        match AlertPriority::for_stock_level(stock, threshold, watch_band).unwrap() {
            Some(priority) => match open {
                // refreshed in place, acknowledgement is not disturbed
                Some(existing) => Some(OpenAlert {
                    priority,
                    acknowledged: existing.acknowledged,
                }),
                None => Some(OpenAlert {
                    priority,
                    acknowledged: false,
                }),
            },
            None => None, // auto-resolved
        }
    }

    fn priority_rank(p: AlertPriority) -> u8 {
        match p {
            AlertPriority::High => 3,
            AlertPriority::Medium => 2,
            AlertPriority::Low => 1,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Every non-negative stock level lands in exactly one band
        #[test]
        fn prop_priority_is_total(
            stock in 0i32..100_000,
            threshold in 1i32..10_000,
            watch_band in 100u32..300,
        ) {
            let priority =
                AlertPriority::for_stock_level(stock, threshold, watch_band).unwrap();

            let stock64 = stock as i64;
            let threshold64 = threshold as i64;
            match priority {
                Some(AlertPriority::High) => prop_assert!(stock64 * 2 <= threshold64),
                Some(AlertPriority::Medium) => {
                    prop_assert!(stock64 * 2 > threshold64 && stock64 <= threshold64)
                }
                Some(AlertPriority::Low) => {
                    prop_assert!(stock64 > threshold64);
                    prop_assert!(stock64 * 100 <= threshold64 * watch_band as i64);
                }
                None => prop_assert!(stock64 * 100 > threshold64 * watch_band as i64),
            }
        }

        /// Less stock never means a less urgent priority
        #[test]
        fn prop_priority_monotone_in_stock(
            stock in 1i32..10_000,
            threshold in 1i32..1_000,
        ) {
            let lower = AlertPriority::for_stock_level(stock - 1, threshold, 120).unwrap();
            let higher = AlertPriority::for_stock_level(stock, threshold, 120).unwrap();

            let rank = |p: Option<AlertPriority>| p.map(priority_rank).unwrap_or(0);
            prop_assert!(rank(lower) >= rank(higher));
        }

        /// Re-evaluating an unchanged product leaves the ledger unchanged
        #[test]
        fn prop_evaluation_is_idempotent(
            stock in 0i32..5_000,
            threshold in 1i32..1_000,
        ) {
            let first = simulate_evaluation(None, stock, threshold, 120);
            let second = simulate_evaluation(first, stock, threshold, 120);
            prop_assert_eq!(first, second);
        }

        /// Acknowledgement survives priority refreshes; recovery clears the
        /// alert no matter what state it was in
        #[test]
        fn prop_acknowledgement_survives_refresh(
            stock_a in 0i32..100,
            stock_b in 0i32..100,
            threshold in 50i32..100,
        ) {
            let opened = simulate_evaluation(None, stock_a, threshold, 120);
            prop_assume!(opened.is_some());

            let acknowledged = opened.map(|a| OpenAlert { acknowledged: true, ..a });
            let after = simulate_evaluation(acknowledged, stock_b, threshold, 120);

            match after {
                Some(alert) => prop_assert!(alert.acknowledged),
                // stock_b recovered above the watch band
                None => prop_assert!(
                    stock_b as i64 * 100 > threshold as i64 * 120
                ),
            }
        }
    }
}
