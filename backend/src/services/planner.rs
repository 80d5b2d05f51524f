//! Replenishment planner: turns an alert or a manual request into an
//! order-ready purchase draft
//!
//! A draft is a forward-looking intent record. Creating one never changes
//! alert status; the alert stays open until stock physically arrives and the
//! monitor auto-resolves it. The central correctness property here is the
//! duplicate-order guard: an alert can have at most one open draft.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::purchasing::PurchasingClient;
use crate::models::{
    default_order_quantity, validate_quantity_override, AlertStatus, DraftLine, OrderStatus,
    Product, PurchaseOrderDraft,
};
use crate::services::catalog::{self, ProductRow};
use crate::services::monitor::ReplenishmentPolicy;

/// Replenishment planner service
#[derive(Clone)]
pub struct PlannerService {
    db: PgPool,
    policy: ReplenishmentPolicy,
}

/// Input for creating a purchase-order draft
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDraftInput {
    /// Source alert; omit for a manual draft
    pub alert_id: Option<Uuid>,
    /// Product for a manual draft (ignored when `alert_id` is set)
    pub product_id: Option<Uuid>,
    /// Explicit quantity override; the default policy applies when omitted
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

/// Row for draft queries
#[derive(Debug, FromRow)]
struct DraftRow {
    id: Uuid,
    alert_id: Option<Uuid>,
    supplier_id: Uuid,
    status: String,
    external_order_number: Option<String>,
    notes: Option<String>,
    expected_delivery: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

/// Row for draft line queries
#[derive(Debug, FromRow)]
struct LineRow {
    draft_id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

impl DraftRow {
    fn into_draft(self, lines: Vec<DraftLine>) -> AppResult<PurchaseOrderDraft> {
        Ok(PurchaseOrderDraft {
            id: self.id,
            alert_id: self.alert_id,
            supplier_id: self.supplier_id,
            status: OrderStatus::parse(&self.status)?,
            external_order_number: self.external_order_number,
            notes: self.notes,
            expected_delivery: self.expected_delivery,
            created_at: self.created_at,
            lines,
        })
    }
}

impl From<LineRow> for DraftLine {
    fn from(row: LineRow) -> Self {
        DraftLine {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

impl PlannerService {
    /// Create a new PlannerService instance
    pub fn new(db: PgPool, policy: ReplenishmentPolicy) -> Self {
        Self { db, policy }
    }

    /// Create a draft from an alert or as a manual request
    pub async fn create(&self, input: CreateDraftInput) -> AppResult<PurchaseOrderDraft> {
        match (input.alert_id, input.product_id) {
            (Some(alert_id), _) => {
                self.draft_from_alert(alert_id, input.quantity, input.notes)
                    .await
            }
            (None, Some(product_id)) => {
                self.manual_draft(product_id, input.quantity, input.notes)
                    .await
            }
            (None, None) => Err(AppError::Validation {
                field: "alert_id".to_string(),
                message: "Either alert_id or product_id must be provided".to_string(),
            }),
        }
    }

    /// Create a draft for an open alert.
    ///
    /// Fails with `AlertAlreadyResolved` for resolved alerts and with
    /// `NoOpenDraftAllowed` when an open draft already exists for the alert.
    /// The alert row lock makes the check-then-act atomic: two concurrent
    /// requests for the same alert serialize here and the second one fails.
    pub async fn draft_from_alert(
        &self,
        alert_id: Uuid,
        requested_quantity: Option<i32>,
        notes: Option<String>,
    ) -> AppResult<PurchaseOrderDraft> {
        let mut tx = self.db.begin().await?;

        let alert = sqlx::query_as::<_, (Uuid, String, Uuid)>(
            "SELECT id, status, product_id FROM alerts WHERE id = $1 FOR UPDATE",
        )
        .bind(alert_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert".to_string()))?;

        let status = AlertStatus::parse(&alert.1)?;
        if !status.is_open() {
            return Err(AppError::AlertAlreadyResolved(format!(
                "Alert {} is already resolved",
                alert_id
            )));
        }

        let has_open_draft: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM purchase_order_drafts
                WHERE alert_id = $1 AND status = ANY($2)
            )
            "#,
        )
        .bind(alert_id)
        .bind(OrderStatus::open_statuses())
        .fetch_one(&mut *tx)
        .await?;

        if has_open_draft {
            return Err(AppError::NoOpenDraftAllowed(format!(
                "Alert {} already has an open draft",
                alert_id
            )));
        }

        let draft = self
            .insert_draft(&mut tx, Some(alert_id), alert.2, requested_quantity, notes)
            .await?;

        tx.commit().await?;

        tracing::info!(
            draft_id = %draft.id,
            alert_id = %alert_id,
            quantity = draft.lines[0].quantity,
            "purchase order draft created from alert"
        );

        Ok(draft)
    }

    /// Create a manual draft not tied to any alert
    pub async fn manual_draft(
        &self,
        product_id: Uuid,
        requested_quantity: Option<i32>,
        notes: Option<String>,
    ) -> AppResult<PurchaseOrderDraft> {
        let mut tx = self.db.begin().await?;
        let draft = self
            .insert_draft(&mut tx, None, product_id, requested_quantity, notes)
            .await?;
        tx.commit().await?;

        tracing::info!(
            draft_id = %draft.id,
            product_id = %product_id,
            "manual purchase order draft created"
        );

        Ok(draft)
    }

    async fn insert_draft(
        &self,
        conn: &mut PgConnection,
        alert_id: Option<Uuid>,
        product_id: Uuid,
        requested_quantity: Option<i32>,
        notes: Option<String>,
    ) -> AppResult<PurchaseOrderDraft> {
        let product: Product = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, current_stock, low_stock_threshold, unit_price,
                   supplier_id, active, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?
        .into();

        if !product.active {
            return Err(AppError::Conflict {
                resource: "product".to_string(),
                message: format!("Product {} is deactivated", product.name),
            });
        }

        let supplier = catalog::get_supplier(conn, product.supplier_id).await?;

        // manual override trumps policy but still has to be positive
        let quantity = match requested_quantity {
            Some(quantity) => validate_quantity_override(quantity)?,
            None => default_order_quantity(
                product.current_stock,
                product.low_stock_threshold,
                self.policy.minimum_order_size,
                supplier.packaging_multiple,
            )?,
        };

        let lead_time_days = supplier
            .lead_time_days
            .map(i64::from)
            .unwrap_or(self.policy.default_lead_time_days);
        let expected_delivery = Utc::now() + Duration::days(lead_time_days);

        let (draft_id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO purchase_order_drafts (alert_id, supplier_id, status, notes, expected_delivery)
            VALUES ($1, $2, 'draft', $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(alert_id)
        .bind(supplier.id)
        .bind(&notes)
        .bind(expected_delivery)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO purchase_order_draft_lines (draft_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(draft_id)
        .bind(product.id)
        .bind(quantity)
        .bind(product.unit_price)
        .execute(&mut *conn)
        .await?;

        let draft = PurchaseOrderDraft {
            id: draft_id,
            alert_id,
            supplier_id: supplier.id,
            status: OrderStatus::Draft,
            external_order_number: None,
            notes,
            expected_delivery,
            created_at,
            lines: vec![DraftLine {
                product_id: product.id,
                product_name: product.name,
                quantity,
                unit_price: product.unit_price,
            }],
        };

        tracing::debug!(
            draft_id = %draft.id,
            cost_preview = %draft.cost_preview(),
            "draft cost preview computed"
        );

        Ok(draft)
    }

    /// Get a draft with its lines
    pub async fn get(&self, draft_id: Uuid) -> AppResult<PurchaseOrderDraft> {
        let row = sqlx::query_as::<_, DraftRow>(
            r#"
            SELECT id, alert_id, supplier_id, status, external_order_number, notes,
                   expected_delivery, created_at
            FROM purchase_order_drafts
            WHERE id = $1
            "#,
        )
        .bind(draft_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order draft".to_string()))?;

        let lines = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT l.draft_id, l.product_id, p.name AS product_name, l.quantity, l.unit_price
            FROM purchase_order_draft_lines l
            JOIN products p ON p.id = l.product_id
            WHERE l.draft_id = $1
            "#,
        )
        .bind(draft_id)
        .fetch_all(&self.db)
        .await?;

        row.into_draft(lines.into_iter().map(DraftLine::from).collect())
    }

    /// List all drafts with their lines
    pub async fn list(&self) -> AppResult<Vec<PurchaseOrderDraft>> {
        let rows = sqlx::query_as::<_, DraftRow>(
            r#"
            SELECT id, alert_id, supplier_id, status, external_order_number, notes,
                   expected_delivery, created_at
            FROM purchase_order_drafts
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let draft_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let line_rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT l.draft_id, l.product_id, p.name AS product_name, l.quantity, l.unit_price
            FROM purchase_order_draft_lines l
            JOIN products p ON p.id = l.product_id
            WHERE l.draft_id = ANY($1)
            "#,
        )
        .bind(&draft_ids)
        .fetch_all(&self.db)
        .await?;

        let mut lines_by_draft: HashMap<Uuid, Vec<DraftLine>> = HashMap::new();
        for line in line_rows {
            lines_by_draft
                .entry(line.draft_id)
                .or_default()
                .push(line.into());
        }

        rows.into_iter()
            .map(|row| {
                let lines = lines_by_draft.remove(&row.id).unwrap_or_default();
                row.into_draft(lines)
            })
            .collect()
    }

    /// Submit a draft to the external Purchasing system, which assigns the
    /// authoritative order number and takes over the status lifecycle. A
    /// failed submission leaves the draft untouched.
    pub async fn submit(
        &self,
        draft_id: Uuid,
        client: &PurchasingClient,
    ) -> AppResult<PurchaseOrderDraft> {
        let draft = self.get(draft_id).await?;

        if draft.status != OrderStatus::Draft {
            return Err(AppError::Conflict {
                resource: "draft".to_string(),
                message: format!(
                    "Draft is already {} with the purchasing system",
                    draft.status.as_str()
                ),
            });
        }

        let confirmation = client.submit_order(&draft).await?;
        let status = OrderStatus::parse(&confirmation.status).map_err(|_| {
            AppError::PurchasingError(format!(
                "Purchasing system returned unknown status '{}'",
                confirmation.status
            ))
        })?;

        sqlx::query(
            "UPDATE purchase_order_drafts SET external_order_number = $1, status = $2 WHERE id = $3",
        )
        .bind(&confirmation.order_number)
        .bind(status.as_str())
        .bind(draft_id)
        .execute(&self.db)
        .await?;

        tracing::info!(
            draft_id = %draft_id,
            order_number = %confirmation.order_number,
            status = status.as_str(),
            "draft submitted to purchasing system"
        );

        self.get(draft_id).await
    }

    /// Refresh a submitted draft's status from the Purchasing system
    pub async fn sync(
        &self,
        draft_id: Uuid,
        client: &PurchasingClient,
    ) -> AppResult<PurchaseOrderDraft> {
        let draft = self.get(draft_id).await?;

        let Some(order_number) = &draft.external_order_number else {
            return Err(AppError::Conflict {
                resource: "draft".to_string(),
                message: "Draft has not been submitted to the purchasing system".to_string(),
            });
        };

        let remote = client.get_order_status(order_number).await?;
        let status = OrderStatus::parse(&remote.status).map_err(|_| {
            AppError::PurchasingError(format!(
                "Purchasing system returned unknown status '{}'",
                remote.status
            ))
        })?;

        sqlx::query("UPDATE purchase_order_drafts SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(draft_id)
            .execute(&self.db)
            .await?;

        self.get(draft_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_override_is_validated_at_the_boundary() {
        let input = CreateDraftInput {
            alert_id: None,
            product_id: Some(Uuid::new_v4()),
            quantity: Some(0),
            notes: None,
        };
        let err = AppError::from(input.validate().unwrap_err());
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));

        let ok = CreateDraftInput {
            alert_id: None,
            product_id: Some(Uuid::new_v4()),
            quantity: Some(5),
            notes: None,
        };
        assert!(ok.validate().is_ok());
    }
}
