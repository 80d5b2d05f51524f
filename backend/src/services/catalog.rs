//! Catalog store: authoritative product stock and threshold state
//!
//! `adjust_stock` is the single mutation primitive; sales dispatch,
//! receiving, and bill reconciliation all go through it, so the threshold
//! monitor has one observation point and alert state never lags stock state
//! by more than one evaluation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Product, StockMovement, Supplier};
use crate::services::monitor::{self, ReplenishmentPolicy};

/// Catalog service over the product and supplier tables
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
    policy: ReplenishmentPolicy,
}

/// Row for product queries
#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub current_stock: i32,
    pub low_stock_threshold: i32,
    pub unit_price: Decimal,
    pub supplier_id: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            category: row.category,
            current_stock: row.current_stock,
            low_stock_threshold: row.low_stock_threshold,
            unit_price: row.unit_price,
            supplier_id: row.supplier_id,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row for supplier queries
#[derive(Debug, FromRow)]
pub(crate) struct SupplierRow {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub packaging_multiple: Option<i32>,
    pub lead_time_days: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            contact_email: row.contact_email,
            packaging_multiple: row.packaging_multiple,
            lead_time_days: row.lead_time_days,
            created_at: row.created_at,
        }
    }
}

/// Row for stock movement queries
#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    delta: i32,
    reason: String,
    stock_after: i32,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for StockMovement {
    fn from(row: MovementRow) -> Self {
        StockMovement {
            id: row.id,
            product_id: row.product_id,
            delta: row.delta,
            reason: row.reason,
            stock_after: row.stock_after,
            created_at: row.created_at,
        }
    }
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool, policy: ReplenishmentPolicy) -> Self {
        Self { db, policy }
    }

    /// Get a product by id
    pub async fn get(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, current_stock, low_stock_threshold, unit_price,
                   supplier_id, active, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    /// List active products
    pub async fn list(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, current_stock, low_stock_threshold, unit_price,
                   supplier_id, active, created_at, updated_at
            FROM products
            WHERE active = true
            ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// List products at or below their low-stock threshold, most critical
    /// first (ascending stock/threshold ratio)
    pub async fn list_below_threshold(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, current_stock, low_stock_threshold, unit_price,
                   supplier_id, active, created_at, updated_at
            FROM products
            WHERE active = true AND current_stock <= low_stock_threshold
            ORDER BY (current_stock::numeric / low_stock_threshold) ASC, name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Atomically apply a stock delta.
    ///
    /// The product row is locked for the duration of the call, so concurrent
    /// adjustments on the same product serialize and their deltas compose;
    /// adjustments on different products proceed independently. The threshold
    /// monitor is notified inside the same transaction.
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        delta: i32,
        reason: &str,
    ) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;

        let product = apply_adjustment(&mut tx, product_id, delta, reason, &self.policy).await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %product_id,
            delta,
            reason,
            stock = product.current_stock,
            "stock adjusted"
        );

        Ok(product)
    }

    /// List the stock movement audit trail for a product, newest first
    pub async fn list_movements(&self, product_id: Uuid) -> AppResult<Vec<StockMovement>> {
        // 404 for unknown products instead of an empty trail
        self.get(product_id).await?;

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, product_id, delta, reason, stock_after, created_at
            FROM stock_movements
            WHERE product_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockMovement::from).collect())
    }

    /// List suppliers
    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(
            r#"
            SELECT id, name, contact_email, packaging_multiple, lead_time_days, created_at
            FROM suppliers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Supplier::from).collect())
    }
}

/// Core of `adjust_stock`, usable inside an enclosing transaction.
///
/// Bill reconciliation applies every line of a batch through this within a
/// single transaction, which is what makes the batch all-or-nothing.
pub(crate) async fn apply_adjustment(
    conn: &mut PgConnection,
    product_id: Uuid,
    delta: i32,
    reason: &str,
    policy: &ReplenishmentPolicy,
) -> AppResult<Product> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, name, category, current_stock, low_stock_threshold, unit_price,
               supplier_id, active, created_at, updated_at
        FROM products
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    if !row.active {
        return Err(AppError::Conflict {
            resource: "product".to_string(),
            message: format!("Product {} is deactivated", row.name),
        });
    }

    let new_stock = row.current_stock as i64 + delta as i64;
    if new_stock < 0 {
        return Err(AppError::InvalidQuantity(format!(
            "Adjustment of {} would drive stock below zero ({} on hand)",
            delta, row.current_stock
        )));
    }
    if new_stock > i32::MAX as i64 {
        return Err(AppError::InvalidQuantity(format!(
            "Adjustment of {} overflows the stock counter",
            delta
        )));
    }

    let updated = sqlx::query_as::<_, ProductRow>(
        r#"
        UPDATE products
        SET current_stock = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING id, name, category, current_stock, low_stock_threshold, unit_price,
                  supplier_id, active, created_at, updated_at
        "#,
    )
    .bind(new_stock as i32)
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO stock_movements (product_id, delta, reason, stock_after)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(reason)
    .bind(new_stock as i32)
    .execute(&mut *conn)
    .await?;

    let product: Product = updated.into();

    // Threshold evaluation shares the stock-write transaction, so a reader
    // never observes a stock change without the matching alert state.
    monitor::evaluate_product(conn, &product, policy).await?;

    Ok(product)
}

/// Get a supplier inside an enclosing transaction
pub(crate) async fn get_supplier(conn: &mut PgConnection, supplier_id: Uuid) -> AppResult<Supplier> {
    let row = sqlx::query_as::<_, SupplierRow>(
        r#"
        SELECT id, name, contact_email, packaging_multiple, lead_time_days, created_at
        FROM suppliers
        WHERE id = $1
        "#,
    )
    .bind(supplier_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

    Ok(row.into())
}
