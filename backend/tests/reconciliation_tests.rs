//! Bill reconciliation tests
//!
//! Tests for the review-and-merge pipeline:
//! - Name normalization and similarity scoring
//! - Folding review adjustments into extraction output
//! - All-or-nothing semantics of a reconciliation batch

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{apply_adjustments, ExtractedLineItem, ExtractionResult, LineAdjustment};
use shared::validation::{name_similarity, normalize_product_name};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn line(raw_name: &str, quantity: i32, price: &str) -> ExtractedLineItem {
    ExtractedLineItem {
        raw_name: raw_name.to_string(),
        quantity,
        unit_price: dec(price),
        confidence: 0.9,
    }
}

fn extraction(lines: Vec<ExtractedLineItem>) -> ExtractionResult {
    ExtractionResult {
        bill_number: "INV-1042".to_string(),
        supplier_guess: Some("Acme Supplies".to_string()),
        bill_date: None,
        lines,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Normalization strips case, punctuation, and extra whitespace
    #[test]
    fn test_name_normalization() {
        assert_eq!(
            normalize_product_name("Packing-Tape (48mm)"),
            "packing tape 48mm"
        );
        assert_eq!(normalize_product_name("  STRETCH   FILM  "), "stretch film");
        assert_eq!(normalize_product_name("!!!"), "");
    }

    /// Identical names after normalization score 1.0
    #[test]
    fn test_similarity_identity() {
        assert_eq!(name_similarity("Packing Tape", "packing-tape"), 1.0);
    }

    /// OCR-noisy names still clear a typical acceptance threshold
    #[test]
    fn test_similarity_tolerates_noise() {
        assert!(name_similarity("Packing Tape 48mm", "Packng Tape 48mm") > 0.8);
        assert!(name_similarity("Stretch Film Roll", "stretch film rol") > 0.8);
    }

    /// Unrelated names score low
    #[test]
    fn test_similarity_rejects_unrelated() {
        assert!(name_similarity("Packing Tape", "Wooden Pallet") < 0.3);
        assert_eq!(name_similarity("Packing Tape", ""), 0.0);
    }

    /// Adjustments override only the fields they set
    #[test]
    fn test_adjustments_are_field_level() {
        let product_id = Uuid::new_v4();
        let extraction = extraction(vec![
            line("packng tape", 12, "2.40"),
            line("stretch film", 4, "11.00"),
        ]);

        let adjusted = apply_adjustments(
            &extraction,
            &[LineAdjustment {
                line_index: 0,
                raw_name: Some("Packing Tape 48mm".to_string()),
                quantity: None,
                unit_price: Some(dec("2.35")),
                product_id: Some(product_id),
            }],
        );

        assert_eq!(adjusted[0].raw_name, "Packing Tape 48mm");
        assert_eq!(adjusted[0].quantity, 12);
        assert_eq!(adjusted[0].unit_price, dec("2.35"));
        assert_eq!(adjusted[0].product_id, Some(product_id));

        // second line passes through untouched
        assert_eq!(adjusted[1].raw_name, "stretch film");
        assert_eq!(adjusted[1].product_id, None);
    }

    /// Adjustments for lines the extraction does not have are dropped
    #[test]
    fn test_out_of_range_adjustment_ignored() {
        let extraction = extraction(vec![line("tape", 3, "1.00")]);
        let adjusted = apply_adjustments(
            &extraction,
            &[LineAdjustment {
                line_index: 5,
                raw_name: None,
                quantity: Some(99),
                unit_price: None,
                product_id: None,
            }],
        );
        assert_eq!(adjusted.len(), 1);
        assert_eq!(adjusted[0].quantity, 3);
    }

    /// Later adjustments to the same line win
    #[test]
    fn test_last_adjustment_wins() {
        let extraction = extraction(vec![line("tape", 3, "1.00")]);
        let adjusted = apply_adjustments(
            &extraction,
            &[
                LineAdjustment {
                    line_index: 0,
                    raw_name: None,
                    quantity: Some(5),
                    unit_price: None,
                    product_id: None,
                },
                LineAdjustment {
                    line_index: 0,
                    raw_name: None,
                    quantity: Some(8),
                    unit_price: None,
                    product_id: None,
                },
            ],
        );
        assert_eq!(adjusted[0].quantity, 8);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Pure simulation of applying a reconciliation batch against stock
    /// levels: every line must apply or none do.
    fn simulate_batch(stocks: &mut Vec<i64>, batch: &[(usize, i32)]) -> bool {
        let snapshot = stocks.clone();
        for (index, quantity) in batch {
            if *quantity < 1 || *index >= stocks.len() {
                *stocks = snapshot;
                return false;
            }
            stocks[*index] += *quantity as i64;
        }
        true
    }

    fn name_strategy() -> impl Strategy<Value = String> {
        "[a-z]{2,12}( [a-z0-9]{1,8}){0,2}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Similarity is symmetric and bounded
        #[test]
        fn prop_similarity_symmetric_and_bounded(
            a in name_strategy(),
            b in name_strategy(),
        ) {
            let ab = name_similarity(&a, &b);
            let ba = name_similarity(&b, &a);
            prop_assert!((ab - ba).abs() < 1e-12);
            prop_assert!((0.0..=1.0).contains(&ab));
        }

        /// A name always matches itself perfectly
        #[test]
        fn prop_similarity_identity(a in name_strategy()) {
            prop_assert_eq!(name_similarity(&a, &a), 1.0);
        }

        /// Folding no adjustments preserves the extraction verbatim
        #[test]
        fn prop_no_adjustments_is_identity(
            quantities in prop::collection::vec(1i32..1_000, 1..8),
        ) {
            let lines: Vec<ExtractedLineItem> = quantities
                .iter()
                .map(|q| line("tape", *q, "1.50"))
                .collect();
            let extraction = extraction(lines);
            let folded = apply_adjustments(&extraction, &[]);

            prop_assert_eq!(folded.len(), extraction.lines.len());
            for (folded_line, original) in folded.iter().zip(&extraction.lines) {
                prop_assert_eq!(&folded_line.raw_name, &original.raw_name);
                prop_assert_eq!(folded_line.quantity, original.quantity);
                prop_assert_eq!(folded_line.product_id, None);
            }
        }

        /// A failing line leaves every stock level exactly where it was
        #[test]
        fn prop_batch_is_all_or_nothing(
            initial in prop::collection::vec(0i64..10_000, 1..6),
            batch in prop::collection::vec((0usize..8, -5i32..500), 1..10),
        ) {
            let mut stocks = initial.clone();
            let applied = simulate_batch(&mut stocks, &batch);

            if applied {
                // every line landed
                let mut expected = initial.clone();
                for (index, quantity) in &batch {
                    expected[*index] += *quantity as i64;
                }
                prop_assert_eq!(&stocks, &expected);
            } else {
                // nothing landed
                prop_assert_eq!(&stocks, &initial);
            }
        }
    }
}
