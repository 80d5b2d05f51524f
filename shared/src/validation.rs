//! Validation utilities for the Warehouse Management Platform

use rust_decimal::Decimal;

// ============================================================================
// Inventory Validations
// ============================================================================

/// Validate that a quantity is strictly positive
pub fn validate_positive_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 1 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a unit price (non-negative)
pub fn validate_unit_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// Validate an extraction confidence score is in [0, 1]
pub fn validate_confidence(confidence: f32) -> Result<(), &'static str> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err("Confidence must be between 0 and 1");
    }
    Ok(())
}

// ============================================================================
// Product Name Matching
// ============================================================================

/// Normalize a product name for matching: lowercase, punctuation stripped,
/// whitespace collapsed.
pub fn normalize_product_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut last_was_space = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            normalized.extend(c.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            normalized.push(' ');
            last_was_space = true;
        }
    }
    normalized.trim_end().to_string()
}

/// Similarity of two product names in [0, 1] using the Dice coefficient over
/// character bigrams of the normalized names.
///
/// Used to auto-map extracted bill lines onto catalog products; the caller
/// decides the acceptance threshold.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_product_name(a);
    let b = normalize_product_name(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let bigrams_a = bigrams(&a);
    let bigrams_b = bigrams(&b);
    if bigrams_a.is_empty() || bigrams_b.is_empty() {
        return 0.0;
    }

    let mut remaining = bigrams_b.clone();
    let mut overlap = 0usize;
    for bigram in &bigrams_a {
        if let Some(pos) = remaining.iter().position(|other| other == bigram) {
            remaining.swap_remove(pos);
            overlap += 1;
        }
    }

    (2.0 * overlap as f64) / (bigrams_a.len() + bigrams_b.len()) as f64
}

fn bigrams(s: &str) -> Vec<[char; 2]> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| [w[0], w[1]]).collect()
}
