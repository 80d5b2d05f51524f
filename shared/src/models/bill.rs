//! Scanned-bill extraction and reconciliation models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured output of the external bill text-extraction service.
///
/// Ephemeral: it exists only during the review step. Once confirmed it is
/// consumed into catalog mutations plus a stored bill record and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub bill_number: String,
    pub supplier_guess: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub lines: Vec<ExtractedLineItem>,
}

/// One extracted line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedLineItem {
    pub raw_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Extraction confidence in [0, 1]. Advisory display metadata only: it
    /// drives default UI emphasis and is never used to drop a line.
    pub confidence: f32,
}

/// A human adjustment to one extracted line, keyed by line index.
/// Every field is optional; unset fields keep the extracted value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineAdjustment {
    pub line_index: usize,
    pub raw_name: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    /// Explicit product mapping chosen during review
    pub product_id: Option<Uuid>,
}

/// A line ready for reconciliation: extracted values with any adjustments
/// already folded in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillLineInput {
    pub product_id: Option<Uuid>,
    pub raw_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub confidence: f32,
}

/// Fold human adjustments into an extraction result, producing the line
/// inputs the merger consumes. Adjustments pointing at indexes outside the
/// extraction are ignored.
pub fn apply_adjustments(
    extraction: &ExtractionResult,
    adjustments: &[LineAdjustment],
) -> Vec<BillLineInput> {
    let mut lines: Vec<BillLineInput> = extraction
        .lines
        .iter()
        .map(|line| BillLineInput {
            product_id: None,
            raw_name: line.raw_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            confidence: line.confidence,
        })
        .collect();

    for adjustment in adjustments {
        let Some(line) = lines.get_mut(adjustment.line_index) else {
            continue;
        };
        if let Some(name) = &adjustment.raw_name {
            line.raw_name = name.clone();
        }
        if let Some(quantity) = adjustment.quantity {
            line.quantity = quantity;
        }
        if let Some(price) = adjustment.unit_price {
            line.unit_price = price;
        }
        if let Some(product_id) = adjustment.product_id {
            line.product_id = Some(product_id);
        }
    }

    lines
}

/// How a reconciled line was mapped onto the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    /// Mapping chosen explicitly during review
    Explicit,
    /// Automatic name-similarity match
    NameMatch,
    /// No mapping found; excluded from stock mutation, kept for audit
    Unmapped,
}

impl MappingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingSource::Explicit => "explicit",
            MappingSource::NameMatch => "name_match",
            MappingSource::Unmapped => "unmapped",
        }
    }

    pub fn parse(s: &str) -> Result<Self, super::DomainError> {
        match s {
            "explicit" => Ok(MappingSource::Explicit),
            "name_match" => Ok(MappingSource::NameMatch),
            "unmapped" => Ok(MappingSource::Unmapped),
            other => Err(super::DomainError::UnknownValue {
                field: "mapping source",
                value: other.to_string(),
            }),
        }
    }
}

/// A reconciled line as stored on the confirmed bill record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledLine {
    pub line_index: i32,
    pub raw_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub confidence: f32,
    pub product_id: Option<Uuid>,
    pub mapping: MappingSource,
}

/// A confirmed bill after reconciliation, retained for audit.
/// Unmapped lines are kept even though they applied no stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledBill {
    pub id: Uuid,
    pub bill_number: String,
    pub supplier_name: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<ReconciledLine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn extraction() -> ExtractionResult {
        ExtractionResult {
            bill_number: "INV-1042".to_string(),
            supplier_guess: Some("Acme Supplies".to_string()),
            bill_date: None,
            lines: vec![
                ExtractedLineItem {
                    raw_name: "packng tape 48mm".to_string(),
                    quantity: 12,
                    unit_price: Decimal::from_str("2.40").unwrap(),
                    confidence: 0.72,
                },
                ExtractedLineItem {
                    raw_name: "stretch film".to_string(),
                    quantity: 4,
                    unit_price: Decimal::from_str("11.00").unwrap(),
                    confidence: 0.95,
                },
            ],
        }
    }

    #[test]
    fn adjustments_override_only_set_fields() {
        let product_id = Uuid::new_v4();
        let adjusted = apply_adjustments(
            &extraction(),
            &[LineAdjustment {
                line_index: 0,
                raw_name: Some("Packing Tape 48mm".to_string()),
                quantity: Some(10),
                unit_price: None,
                product_id: Some(product_id),
            }],
        );

        assert_eq!(adjusted[0].raw_name, "Packing Tape 48mm");
        assert_eq!(adjusted[0].quantity, 10);
        assert_eq!(adjusted[0].unit_price, Decimal::from_str("2.40").unwrap());
        assert_eq!(adjusted[0].product_id, Some(product_id));
        // untouched line passes through, confidence preserved verbatim
        assert_eq!(adjusted[1].quantity, 4);
        assert!((adjusted[1].confidence - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_adjustments_are_ignored() {
        let adjusted = apply_adjustments(
            &extraction(),
            &[LineAdjustment {
                line_index: 7,
                raw_name: None,
                quantity: Some(99),
                unit_price: None,
                product_id: None,
            }],
        );
        assert_eq!(adjusted.len(), 2);
        assert_eq!(adjusted[0].quantity, 12);
        assert_eq!(adjusted[1].quantity, 4);
    }
}
