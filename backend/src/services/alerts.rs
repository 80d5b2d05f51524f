//! Alert ledger: CRUD and lifecycle for alerts
//!
//! Enforces the single-open-alert-per-product invariant for low-stock alerts
//! and the `active -> acknowledged -> resolved` state machine. Alerts are
//! never hard-deleted; `resolved` is terminal and kept for audit.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{low_stock_message, Alert, AlertKind, AlertPriority, AlertStatus, Product};

/// Alert ledger service
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
}

/// Row for alert queries
#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    product_id: Uuid,
    kind: String,
    priority: String,
    status: String,
    message: String,
    stock_snapshot: i32,
    threshold_snapshot: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = AppError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: row.id,
            product_id: row.product_id,
            kind: AlertKind::parse(&row.kind)?,
            priority: AlertPriority::parse(&row.priority)?,
            status: AlertStatus::parse(&row.status)?,
            message: row.message,
            stock_snapshot: row.stock_snapshot,
            threshold_snapshot: row.threshold_snapshot,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for creating a manual alert
#[derive(Debug, serde::Deserialize, validator::Validate)]
pub struct CreateManualAlertInput {
    pub product_id: Uuid,
    pub priority: AlertPriority,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get an alert by id
    pub async fn get(&self, alert_id: Uuid) -> AppResult<Alert> {
        let row = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, product_id, kind, priority, status, message,
                   stock_snapshot, threshold_snapshot, created_at, updated_at
            FROM alerts
            WHERE id = $1
            "#,
        )
        .bind(alert_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert".to_string()))?;

        row.try_into()
    }

    /// List alerts, optionally filtered by kind and status
    pub async fn list(
        &self,
        kind: Option<AlertKind>,
        status: Option<AlertStatus>,
    ) -> AppResult<Vec<Alert>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, product_id, kind, priority, status, message,
                   stock_snapshot, threshold_snapshot, created_at, updated_at
            FROM alerts
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(kind.map(|k| k.as_str()))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Alert::try_from).collect()
    }

    /// Acknowledge an active alert.
    /// Fails with `InvalidTransition` when the alert is already acknowledged
    /// or resolved.
    pub async fn acknowledge(&self, alert_id: Uuid) -> AppResult<Alert> {
        let mut tx = self.db.begin().await?;

        let row = lock_alert(&mut tx, alert_id).await?;
        let status = AlertStatus::parse(&row.status)?;
        let next = status.transition_to(AlertStatus::Acknowledged)?;

        let updated = set_status(&mut tx, alert_id, next).await?;
        tx.commit().await?;

        tracing::info!(alert_id = %alert_id, "alert acknowledged");
        updated.try_into()
    }

    /// Resolve an alert from `active` or `acknowledged`.
    /// Idempotent: resolving an already-resolved alert returns its current
    /// state instead of failing.
    pub async fn resolve(&self, alert_id: Uuid) -> AppResult<Alert> {
        let mut tx = self.db.begin().await?;

        let row = lock_alert(&mut tx, alert_id).await?;
        let status = AlertStatus::parse(&row.status)?;

        if status == AlertStatus::Resolved {
            tx.commit().await?;
            return row.try_into();
        }

        let next = status.transition_to(AlertStatus::Resolved)?;
        let updated = set_status(&mut tx, alert_id, next).await?;
        tx.commit().await?;

        tracing::info!(alert_id = %alert_id, "alert resolved by operator");
        updated.try_into()
    }

    /// Create a manual alert. Manual alerts are not subject to the low-stock
    /// uniqueness invariant.
    pub async fn create_manual(&self, input: CreateManualAlertInput) -> AppResult<Alert> {
        let mut tx = self.db.begin().await?;

        let snapshot = sqlx::query_as::<_, (i32, i32)>(
            "SELECT current_stock, low_stock_threshold FROM products WHERE id = $1",
        )
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let created = sqlx::query_as::<_, AlertRow>(
            r#"
            INSERT INTO alerts (product_id, kind, priority, status, message,
                                stock_snapshot, threshold_snapshot)
            VALUES ($1, 'manual', $2, 'active', $3, $4, $5)
            RETURNING id, product_id, kind, priority, status, message,
                      stock_snapshot, threshold_snapshot, created_at, updated_at
            "#,
        )
        .bind(input.product_id)
        .bind(input.priority.as_str())
        .bind(&input.message)
        .bind(snapshot.0)
        .bind(snapshot.1)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        created.try_into()
    }
}

async fn lock_alert(conn: &mut PgConnection, alert_id: Uuid) -> AppResult<AlertRow> {
    sqlx::query_as::<_, AlertRow>(
        r#"
        SELECT id, product_id, kind, priority, status, message,
               stock_snapshot, threshold_snapshot, created_at, updated_at
        FROM alerts
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(alert_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Alert".to_string()))
}

async fn set_status(
    conn: &mut PgConnection,
    alert_id: Uuid,
    status: AlertStatus,
) -> AppResult<AlertRow> {
    let row = sqlx::query_as::<_, AlertRow>(
        r#"
        UPDATE alerts
        SET status = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING id, product_id, kind, priority, status, message,
                  stock_snapshot, threshold_snapshot, created_at, updated_at
        "#,
    )
    .bind(status.as_str())
    .bind(alert_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Create or refresh the open low-stock alert for a product.
///
/// If an open (active or acknowledged) low-stock alert exists, its snapshot,
/// priority, and message are refreshed in place without disturbing its
/// status; no duplicate is ever created. When nothing changed, no write is
/// performed at all, which keeps re-evaluation idempotent.
pub(crate) async fn upsert_low_stock_alert(
    conn: &mut PgConnection,
    product: &Product,
    priority: AlertPriority,
) -> AppResult<Alert> {
    let existing = sqlx::query_as::<_, AlertRow>(
        r#"
        SELECT id, product_id, kind, priority, status, message,
               stock_snapshot, threshold_snapshot, created_at, updated_at
        FROM alerts
        WHERE product_id = $1 AND kind = 'low_stock' AND status <> 'resolved'
        FOR UPDATE
        "#,
    )
    .bind(product.id)
    .fetch_optional(&mut *conn)
    .await?;

    let message = low_stock_message(product.current_stock, product.low_stock_threshold);

    if let Some(row) = existing {
        if row.stock_snapshot == product.current_stock
            && row.threshold_snapshot == product.low_stock_threshold
            && row.priority == priority.as_str()
        {
            return row.try_into();
        }

        let updated = sqlx::query_as::<_, AlertRow>(
            r#"
            UPDATE alerts
            SET stock_snapshot = $1, threshold_snapshot = $2, priority = $3,
                message = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING id, product_id, kind, priority, status, message,
                      stock_snapshot, threshold_snapshot, created_at, updated_at
            "#,
        )
        .bind(product.current_stock)
        .bind(product.low_stock_threshold)
        .bind(priority.as_str())
        .bind(&message)
        .bind(row.id)
        .fetch_one(&mut *conn)
        .await?;

        return updated.try_into();
    }

    let created = sqlx::query_as::<_, AlertRow>(
        r#"
        INSERT INTO alerts (product_id, kind, priority, status, message,
                            stock_snapshot, threshold_snapshot)
        VALUES ($1, 'low_stock', $2, 'active', $3, $4, $5)
        RETURNING id, product_id, kind, priority, status, message,
                  stock_snapshot, threshold_snapshot, created_at, updated_at
        "#,
    )
    .bind(product.id)
    .bind(priority.as_str())
    .bind(&message)
    .bind(product.current_stock)
    .bind(product.low_stock_threshold)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(
        product_id = %product.id,
        priority = priority.as_str(),
        stock = product.current_stock,
        threshold = product.low_stock_threshold,
        "low stock alert raised"
    );

    created.try_into()
}

/// Resolve the open low-stock alert for a product with a system note, if one
/// exists. This is the only automatic status transition; a missing alert is
/// a no-op, not an error.
pub(crate) async fn auto_resolve(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<Option<Alert>> {
    let resolved = sqlx::query_as::<_, AlertRow>(
        r#"
        UPDATE alerts
        SET status = 'resolved',
            message = message || ' (auto-resolved: stock recovered)',
            updated_at = NOW()
        WHERE product_id = $1 AND kind = 'low_stock' AND status <> 'resolved'
        RETURNING id, product_id, kind, priority, status, message,
                  stock_snapshot, threshold_snapshot, created_at, updated_at
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    match resolved {
        Some(row) => {
            tracing::info!(product_id = %product_id, "low stock alert auto-resolved");
            Ok(Some(row.try_into()?))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn empty_manual_alert_message_fails_validation() {
        let input = CreateManualAlertInput {
            product_id: Uuid::new_v4(),
            priority: AlertPriority::High,
            message: String::new(),
        };
        let err = AppError::from(input.validate().unwrap_err());
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "message"));
    }

    #[test]
    fn populated_manual_alert_passes_validation() {
        let input = CreateManualAlertInput {
            product_id: Uuid::new_v4(),
            priority: AlertPriority::Low,
            message: "Damaged pallet found during cycle count".to_string(),
        };
        assert!(input.validate().is_ok());
    }
}
