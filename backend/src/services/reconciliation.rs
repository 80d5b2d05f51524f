//! Bill reconciliation merger: folds a reviewed supplier bill into the
//! catalog as one all-or-nothing stock batch
//!
//! Mapping precedence per line: an explicit product chosen during review,
//! then the best name-similarity match at or above the acceptance threshold,
//! otherwise the line stays unmapped. Unmapped lines never mutate stock but
//! are stored on the bill record for audit.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{BillLineInput, MappingSource, ReconciledBill, ReconciledLine};
use crate::services::catalog;
use crate::services::monitor::ReplenishmentPolicy;
use shared::validation::{
    name_similarity, validate_confidence, validate_positive_quantity, validate_unit_price,
};

/// Bill reconciliation service
#[derive(Clone)]
pub struct ReconciliationService {
    db: PgPool,
    policy: ReplenishmentPolicy,
}

/// Confirmed-bill input: extraction output with review adjustments already
/// folded in (see `apply_adjustments`)
#[derive(Debug, Deserialize)]
pub struct ReconcileBillInput {
    pub bill_number: String,
    pub supplier_name: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub lines: Vec<BillLineInput>,
}

/// A stock mutation performed by a reconciliation batch
#[derive(Debug, Clone, Serialize)]
pub struct AppliedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub stock_after: i32,
}

/// Result of a confirmed reconciliation
#[derive(Debug, Serialize)]
pub struct ReconcileOutcome {
    pub bill: ReconciledBill,
    pub applied: Vec<AppliedLine>,
}

/// Suggested catalog mapping for one bill line during review
#[derive(Debug, Clone, Serialize)]
pub struct MappingSuggestion {
    pub line_index: usize,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub score: Option<f64>,
}

/// Row for reconciled-bill queries
#[derive(Debug, FromRow)]
struct BillRow {
    id: Uuid,
    bill_number: String,
    supplier_name: Option<String>,
    bill_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

/// Row for reconciled-line queries
#[derive(Debug, FromRow)]
struct BillLineRow {
    bill_id: Uuid,
    line_index: i32,
    raw_name: String,
    quantity: i32,
    unit_price: Decimal,
    confidence: f32,
    product_id: Option<Uuid>,
    mapping: String,
}

impl BillLineRow {
    fn into_line(self) -> AppResult<ReconciledLine> {
        Ok(ReconciledLine {
            line_index: self.line_index,
            raw_name: self.raw_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            confidence: self.confidence,
            product_id: self.product_id,
            mapping: MappingSource::parse(&self.mapping)?,
        })
    }
}

/// Pick the best catalog match for a raw bill-line name.
///
/// Returns the candidate with the highest similarity at or above the
/// threshold. Candidates must be sorted by name; on a tied score the first
/// one wins, which keeps matching deterministic across runs.
pub(crate) fn best_name_match(
    raw_name: &str,
    candidates: &[(Uuid, String)],
    threshold: f64,
) -> Option<(Uuid, f64)> {
    let mut best: Option<(Uuid, f64)> = None;
    for (id, name) in candidates {
        let score = name_similarity(raw_name, name);
        if score < threshold {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((*id, score)),
        }
    }
    best
}

fn validate_input(input: &ReconcileBillInput) -> AppResult<()> {
    if input.bill_number.trim().is_empty() {
        return Err(AppError::Validation {
            field: "bill_number".to_string(),
            message: "Bill number is required".to_string(),
        });
    }
    if input.lines.is_empty() {
        return Err(AppError::Validation {
            field: "lines".to_string(),
            message: "A bill must have at least one line".to_string(),
        });
    }
    for (index, line) in input.lines.iter().enumerate() {
        if let Err(message) = validate_positive_quantity(line.quantity) {
            return Err(AppError::Validation {
                field: format!("lines[{}].quantity", index),
                message: message.to_string(),
            });
        }
        if let Err(message) = validate_unit_price(line.unit_price) {
            return Err(AppError::Validation {
                field: format!("lines[{}].unit_price", index),
                message: message.to_string(),
            });
        }
        if let Err(message) = validate_confidence(line.confidence) {
            return Err(AppError::Validation {
                field: format!("lines[{}].confidence", index),
                message: message.to_string(),
            });
        }
    }
    Ok(())
}

/// Two reconciliations of the same bill number can race past the existence
/// check; the loser hits the unique constraint and gets the same `Conflict`
/// the sequential retry path returns.
fn duplicate_bill_conflict(err: sqlx::Error, bill_number: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Conflict {
                resource: "bill".to_string(),
                message: format!("Bill {} has already been reconciled", bill_number),
            };
        }
    }
    AppError::DatabaseError(err)
}

impl ReconciliationService {
    /// Create a new ReconciliationService instance
    pub fn new(db: PgPool, policy: ReplenishmentPolicy) -> Self {
        Self { db, policy }
    }

    /// Suggest catalog mappings for extracted lines during review.
    /// Read-only; nothing is recorded.
    pub async fn suggest_mappings(
        &self,
        lines: &[BillLineInput],
    ) -> AppResult<Vec<MappingSuggestion>> {
        let candidates = self.active_product_names(&self.db).await?;

        let suggestions = lines
            .iter()
            .enumerate()
            .map(|(line_index, line)| {
                match best_name_match(&line.raw_name, &candidates, self.policy.name_match_threshold)
                {
                    Some((product_id, score)) => {
                        let product_name = candidates
                            .iter()
                            .find(|(id, _)| *id == product_id)
                            .map(|(_, name)| name.clone());
                        MappingSuggestion {
                            line_index,
                            product_id: Some(product_id),
                            product_name,
                            score: Some(score),
                        }
                    }
                    None => MappingSuggestion {
                        line_index,
                        product_id: None,
                        product_name: None,
                        score: None,
                    },
                }
            })
            .collect();

        Ok(suggestions)
    }

    /// Reconcile a confirmed bill: map every line, apply all mapped lines as
    /// stock increases, and store the bill for audit, all in one transaction.
    ///
    /// Any line failure rolls back the entire batch, so a bill is either
    /// fully applied or not applied at all. Mapped lines are applied in
    /// product-id order, which gives concurrent batches a stable lock order.
    pub async fn reconcile(&self, input: ReconcileBillInput) -> AppResult<ReconcileOutcome> {
        validate_input(&input)?;

        let mut tx = self.db.begin().await?;

        let already_reconciled: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reconciled_bills WHERE bill_number = $1)",
        )
        .bind(&input.bill_number)
        .fetch_one(&mut *tx)
        .await?;

        if already_reconciled {
            return Err(AppError::Conflict {
                resource: "bill".to_string(),
                message: format!("Bill {} has already been reconciled", input.bill_number),
            });
        }

        let candidates = self.active_product_names(&mut *tx).await?;

        let mut resolved: Vec<ReconciledLine> = Vec::with_capacity(input.lines.len());
        for (index, line) in input.lines.iter().enumerate() {
            let (product_id, mapping) = match line.product_id {
                Some(product_id) => (Some(product_id), MappingSource::Explicit),
                None => match best_name_match(
                    &line.raw_name,
                    &candidates,
                    self.policy.name_match_threshold,
                ) {
                    Some((product_id, _)) => (Some(product_id), MappingSource::NameMatch),
                    None => (None, MappingSource::Unmapped),
                },
            };

            resolved.push(ReconciledLine {
                line_index: index as i32,
                raw_name: line.raw_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                confidence: line.confidence,
                product_id,
                mapping,
            });
        }

        // apply in product-id order; a single failure aborts the whole batch
        let mut to_apply: Vec<(Uuid, i32)> = resolved
            .iter()
            .filter_map(|line| line.product_id.map(|id| (id, line.quantity)))
            .collect();
        to_apply.sort_by_key(|(product_id, _)| *product_id);

        let reason = format!("bill-reconciliation:{}", input.bill_number);
        let mut applied = Vec::with_capacity(to_apply.len());
        for (product_id, quantity) in to_apply {
            let product =
                catalog::apply_adjustment(&mut tx, product_id, quantity, &reason, &self.policy)
                    .await
                    .map_err(|err| match err {
                        AppError::DatabaseError(err) => AppError::DatabaseError(err),
                        other => AppError::PartialApplyRejected(format!(
                            "line for product {} failed: {}",
                            product_id, other
                        )),
                    })?;

            applied.push(AppliedLine {
                product_id,
                quantity,
                stock_after: product.current_stock,
            });
        }

        let (bill_id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO reconciled_bills (bill_number, supplier_name, bill_date)
            VALUES ($1, $2, $3)
            RETURNING id, created_at
            "#,
        )
        .bind(&input.bill_number)
        .bind(&input.supplier_name)
        .bind(input.bill_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| duplicate_bill_conflict(err, &input.bill_number))?;

        for line in &resolved {
            sqlx::query(
                r#"
                INSERT INTO reconciled_bill_lines
                    (bill_id, line_index, raw_name, quantity, unit_price,
                     confidence, product_id, mapping)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(bill_id)
            .bind(line.line_index)
            .bind(&line.raw_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.confidence)
            .bind(line.product_id)
            .bind(line.mapping.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let unmapped = resolved
            .iter()
            .filter(|l| l.mapping == MappingSource::Unmapped)
            .count();
        tracing::info!(
            bill_id = %bill_id,
            bill_number = %input.bill_number,
            lines = resolved.len(),
            applied = applied.len(),
            unmapped,
            "bill reconciled"
        );

        Ok(ReconcileOutcome {
            bill: ReconciledBill {
                id: bill_id,
                bill_number: input.bill_number,
                supplier_name: input.supplier_name,
                bill_date: input.bill_date,
                created_at,
                lines: resolved,
            },
            applied,
        })
    }

    /// Get a reconciled bill with its lines
    pub async fn get(&self, bill_id: Uuid) -> AppResult<ReconciledBill> {
        let row = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, bill_number, supplier_name, bill_date, created_at
            FROM reconciled_bills
            WHERE id = $1
            "#,
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reconciled bill".to_string()))?;

        let lines = sqlx::query_as::<_, BillLineRow>(
            r#"
            SELECT bill_id, line_index, raw_name, quantity, unit_price,
                   confidence, product_id, mapping
            FROM reconciled_bill_lines
            WHERE bill_id = $1
            ORDER BY line_index
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ReconciledBill {
            id: row.id,
            bill_number: row.bill_number,
            supplier_name: row.supplier_name,
            bill_date: row.bill_date,
            created_at: row.created_at,
            lines: lines
                .into_iter()
                .map(BillLineRow::into_line)
                .collect::<AppResult<Vec<_>>>()?,
        })
    }

    /// List reconciled bills, newest first, without line detail
    pub async fn list(&self) -> AppResult<Vec<ReconciledBill>> {
        let rows = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, bill_number, supplier_name, bill_date, created_at
            FROM reconciled_bills
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReconciledBill {
                id: row.id,
                bill_number: row.bill_number,
                supplier_name: row.supplier_name,
                bill_date: row.bill_date,
                created_at: row.created_at,
                lines: Vec::new(),
            })
            .collect())
    }

    async fn active_product_names<'e, E>(&self, executor: E) -> AppResult<Vec<(Uuid, String)>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let candidates: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT id, name FROM products WHERE active = true ORDER BY name",
        )
        .fetch_all(executor)
        .await?;
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<(Uuid, String)> {
        vec![
            (Uuid::new_v4(), "Bubble Wrap Roll".to_string()),
            (Uuid::new_v4(), "Packing Tape 48mm".to_string()),
            (Uuid::new_v4(), "Stretch Film Roll".to_string()),
        ]
    }

    #[test]
    fn best_match_tolerates_extraction_noise() {
        let candidates = candidates();
        let (id, score) = best_name_match("packng tape 48mm", &candidates, 0.8)
            .expect("noisy name should still match");
        assert_eq!(id, candidates[1].0);
        assert!(score > 0.8);
    }

    #[test]
    fn below_threshold_yields_no_match() {
        let candidates = candidates();
        assert!(best_name_match("Wooden Pallet EUR", &candidates, 0.8).is_none());
    }

    #[test]
    fn tie_goes_to_first_candidate_by_name() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let candidates = vec![
            (a, "Packing Tape".to_string()),
            (b, "packing tape".to_string()),
        ];
        let (id, score) = best_name_match("Packing Tape", &candidates, 0.8)
            .expect("exact name must match");
        assert_eq!(id, a);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn input_validation_rejects_bad_lines() {
        let input = ReconcileBillInput {
            bill_number: "INV-9".to_string(),
            supplier_name: None,
            bill_date: None,
            lines: vec![BillLineInput {
                product_id: None,
                raw_name: "tape".to_string(),
                quantity: 0,
                unit_price: Decimal::ONE,
                confidence: 0.9,
            }],
        };
        let err = validate_input(&input).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "lines[0].quantity"));
    }

    #[test]
    fn input_validation_requires_bill_number_and_lines() {
        let empty_number = ReconcileBillInput {
            bill_number: "  ".to_string(),
            supplier_name: None,
            bill_date: None,
            lines: vec![],
        };
        assert!(validate_input(&empty_number).is_err());
    }

    #[test]
    fn input_validation_rejects_out_of_range_confidence() {
        let input = ReconcileBillInput {
            bill_number: "INV-10".to_string(),
            supplier_name: None,
            bill_date: None,
            lines: vec![BillLineInput {
                product_id: None,
                raw_name: "tape".to_string(),
                quantity: 3,
                unit_price: Decimal::ONE,
                confidence: 1.4,
            }],
        };
        let err = validate_input(&input).unwrap_err();
        assert!(
            matches!(err, AppError::Validation { ref field, .. } if field == "lines[0].confidence")
        );
    }

    /// Stand-in driver error for exercising the unique-violation mapping
    #[derive(Debug)]
    struct StubDbError {
        unique: bool,
    }

    impl std::fmt::Display for StubDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::Other
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn racing_duplicate_bill_maps_to_conflict() {
        let err = sqlx::Error::Database(Box::new(StubDbError { unique: true }));
        let mapped = duplicate_bill_conflict(err, "INV-7");
        assert!(matches!(mapped, AppError::Conflict { ref resource, .. } if resource == "bill"));
    }

    #[test]
    fn other_storage_failures_stay_storage_failures() {
        let db = sqlx::Error::Database(Box::new(StubDbError { unique: false }));
        assert!(matches!(
            duplicate_bill_conflict(db, "INV-7"),
            AppError::DatabaseError(_)
        ));
        assert!(matches!(
            duplicate_bill_conflict(sqlx::Error::RowNotFound, "INV-7"),
            AppError::DatabaseError(_)
        ));
    }
}
